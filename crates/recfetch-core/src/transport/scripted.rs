//! In-memory transport replaying scripted responses per identifier.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::{HttpResponse, Transport, TransportError};
use crate::request::FetchRequest;

pub(crate) enum Step {
    Respond(HttpResponse),
    Fail(String),
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    /// Replayed once `steps` is exhausted.
    fallback: Option<HttpResponse>,
}

/// Unscripted identifiers get `200 {"id": <id>}`.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(self, id: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .steps
            .extend(steps);
        self
    }

    pub(crate) fn always(self, id: &str, response: HttpResponse) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .fallback = Some(response);
        self
    }

    /// Identifiers requested, in call order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_for(&self, id: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == id).count()
    }
}

pub(crate) fn status(code: u32) -> Step {
    Step::Respond(HttpResponse::new(code).with_body(r#"{"message":"scripted"}"#))
}

pub(crate) fn ok(body: &str) -> Step {
    Step::Respond(HttpResponse::new(200).with_body(body))
}

impl Transport for ScriptedTransport {
    fn get(&self, request: &FetchRequest) -> Result<HttpResponse, TransportError> {
        let id = request.identifier().to_string();
        self.calls.lock().unwrap().push(id.clone());

        let mut scripts = self.scripts.lock().unwrap();
        let Some(script) = scripts.get_mut(&id) else {
            return Ok(HttpResponse::new(200).with_body(format!(r#"{{"id":"{}"}}"#, id)));
        };
        match script.steps.pop_front() {
            Some(Step::Respond(r)) => Ok(r),
            Some(Step::Fail(msg)) => Err(TransportError::Connection(msg)),
            None => match &script.fallback {
                Some(r) => Ok(r.clone()),
                None => Err(TransportError::Connection(format!("script for {} exhausted", id))),
            },
        }
    }
}
