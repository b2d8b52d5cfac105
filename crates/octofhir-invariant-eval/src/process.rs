//! Out-of-process expression engine
//!
//! Spawns the evaluator program once per call, writes the request JSON to its
//! stdin and reads one reply from stdout:
//!
//! ```text
//! -> {"resource": {...}, "expression": "..." | {"base": "...", "expression": "..."},
//!     "context": {"rootResource": {...}}, "model": "r4"}
//! <- {"result": [...], "traces": [{"label": "...", "values": [...]}]}
//! <- {"error": "..."}
//! ```

use crate::context::{BindingContext, ExpressionInput};
use crate::engine::{EngineCall, ExpressionEngine};
use crate::error::EngineError;
use log::trace;
use octofhir_invariant_model::FhirVersion;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// Bridge script, relative to the install or checkout directory
pub const DEFAULT_BRIDGE_SCRIPT: &str = "bridge/fhirpath-evaluate.js";

/// Environment variable overriding the bridge script location
pub const BRIDGE_SCRIPT_ENV: &str = "FHIR_INVARIANT_BRIDGE";

/// Locate the bridge script
///
/// `FHIR_INVARIANT_BRIDGE` wins. Otherwise the first existing
/// [`DEFAULT_BRIDGE_SCRIPT`] beside the running executable or up to three
/// directories above it (`target/<profile>/` in a checkout). Falls back to the
/// relative path, resolved against the working directory.
pub fn default_bridge_script() -> String {
    let exe = std::env::current_exe().ok();
    locate_bridge_script(std::env::var(BRIDGE_SCRIPT_ENV).ok(), exe.as_deref())
}

fn locate_bridge_script(overridden: Option<String>, exe: Option<&Path>) -> String {
    if let Some(path) = overridden.filter(|p| !p.is_empty()) {
        return path;
    }
    exe.and_then(Path::parent)
        .into_iter()
        .flat_map(Path::ancestors)
        .take(4)
        .map(|dir| dir.join(DEFAULT_BRIDGE_SCRIPT))
        .find(|candidate| candidate.is_file())
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_BRIDGE_SCRIPT.to_string())
}

/// How to launch the evaluator program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEngineConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl Default for ProcessEngineConfig {
    fn default() -> Self {
        Self {
            program: "node".to_string(),
            args: vec![default_bridge_script()],
            working_dir: None,
        }
    }
}

impl ProcessEngineConfig {
    /// Launch `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[derive(Serialize)]
struct ProcessRequest<'a> {
    resource: &'a Value,
    expression: ExpressionInput<'a>,
    context: BindingContext<'a>,
    model: FhirVersion,
}

#[derive(Deserialize)]
struct ProcessReply {
    #[serde(default)]
    result: Vec<Value>,
    #[serde(default)]
    traces: Vec<ProcessTrace>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ProcessTrace {
    label: String,
    #[serde(default)]
    values: Vec<Value>,
}

/// Engine backed by a child process per call
#[derive(Debug, Clone, Default)]
pub struct ProcessEngine {
    config: ProcessEngineConfig,
}

impl ProcessEngine {
    pub fn new(config: ProcessEngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessEngineConfig {
        &self.config
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl ExpressionEngine for ProcessEngine {
    fn evaluate(&self, call: &EngineCall<'_>) -> Result<Vec<Value>, EngineError> {
        let payload = serde_json::to_vec(&ProcessRequest {
            resource: call.document,
            expression: call.input,
            context: call.context,
            model: call.model,
        })
        .map_err(|e| EngineError::protocol(e.to_string()))?;
        trace!("engine request: {}", String::from_utf8_lossy(&payload));

        let mut child = self
            .command()
            .spawn()
            .map_err(|e| EngineError::Unavailable {
                program: self.config.program.clone(),
                message: e.to_string(),
            })?;

        // The request is written on its own thread so a large reply cannot
        // block against a large request. The child may exit without reading
        // its input; the reply and exit status decide the outcome then.
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || match stdin.write_all(&payload) {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            })
        });
        let output = child
            .wait_with_output()
            .map_err(|e| EngineError::protocol(format!("reading reply: {}", e)))?;
        let written = match writer.map(|handle| handle.join()) {
            Some(Ok(Err(e))) => Err(format!("writing request: {}", e)),
            Some(Err(_)) => Err("writing request: writer thread panicked".to_string()),
            _ => Ok(()),
        };
        trace!("engine reply: {}", String::from_utf8_lossy(&output.stdout));

        let reply = serde_json::from_slice::<ProcessReply>(&output.stdout);
        if let Ok(ProcessReply {
            error: Some(message),
            ..
        }) = &reply
        {
            return Err(EngineError::rejected(message.clone()));
        }
        if !output.status.success() {
            return Err(EngineError::Terminated {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        written.map_err(EngineError::protocol)?;
        let reply = reply.map_err(|e| EngineError::protocol(e.to_string()))?;
        for record in &reply.traces {
            call.emit_trace(&record.label, &record.values);
        }
        Ok(reply.result)
    }

    fn name(&self) -> &str {
        &self.config.program
    }
}
