//! Hands generated source to a running Jupyter kernel.
//!
//! Execution is fire-and-forget: the editor gets an acknowledgement
//! carrying the request's message id. When stdout capture is enabled the
//! client also listens on iopub, within a time limit, for stream output
//! until the kernel reports idle for that request.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use jupyter_protocol::{
  ConnectionInfo, ExecuteRequest, ExecutionState, JupyterMessage,
  JupyterMessageContent, Stdio,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codegen::{generate_with, incomplete_lines, CodegenOptions};
use crate::syntax::CodeLine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionAck {
  pub msg_id: String,
  pub submitted_at: DateTime<Utc>,
  /// Captured stdout, when capture was requested.
  pub stdout: Option<String>,
}

pub trait KernelExecutor {
  fn execute(&mut self, code: &str) -> anyhow::Result<ExecutionAck>;
}

/// Generates source for `lines` and submits it.
pub fn submit(
  executor: &mut dyn KernelExecutor,
  lines: &[CodeLine],
  options: &CodegenOptions,
) -> anyhow::Result<ExecutionAck> {
  let incomplete = incomplete_lines(lines);
  if !incomplete.is_empty() {
    let numbers: Vec<usize> = incomplete.iter().map(|i| i + 1).collect();
    warn!(lines = ?numbers, "unset tokens are left out of the code");
  }
  let code = generate_with(lines, options);
  executor.execute(&code)
}

/// Client for a kernel described by a connection file.
pub struct JupyterKernel {
  connection_info: ConnectionInfo,
  session_id: String,
  capture_timeout: Option<Duration>,
  runtime: tokio::runtime::Runtime,
}

impl JupyterKernel {
  pub fn new(connection_info: ConnectionInfo) -> anyhow::Result<Self> {
    Ok(Self {
      connection_info,
      session_id: Uuid::new_v4().to_string(),
      capture_timeout: None,
      runtime: tokio::runtime::Runtime::new()?,
    })
  }

  pub fn from_connection_file(path: &Path) -> anyhow::Result<Self> {
    let content = std::fs::read_to_string(path).with_context(|| {
      format!("reading connection file {}", path.display())
    })?;
    let connection_info: ConnectionInfo = serde_json::from_str(&content)
      .with_context(|| format!("parsing connection file {}", path.display()))?;
    debug!(
      path = %path.display(),
      ip = %connection_info.ip,
      shell_port = connection_info.shell_port,
      "loaded connection info"
    );
    Self::new(connection_info)
  }

  /// Wait up to `timeout` for the request's stdout.
  pub fn with_stdout_capture(mut self, timeout: Duration) -> Self {
    self.capture_timeout = Some(timeout);
    self
  }

  async fn execute_async(&self, code: &str) -> anyhow::Result<ExecutionAck> {
    let info = &self.connection_info;

    // Subscribe before sending so no output is missed.
    let mut iopub = match self.capture_timeout {
      Some(_) => Some(
        runtimelib::create_client_iopub_connection(info, "", &self.session_id)
          .await?,
      ),
      None => None,
    };

    let identity = runtimelib::peer_identity_for_session(&self.session_id)?;
    let mut shell = runtimelib::create_client_shell_connection_with_identity(
      info,
      &self.session_id,
      identity,
    )
    .await?;

    let message: JupyterMessage = ExecuteRequest::new(code.to_string()).into();
    let msg_id = message.header.msg_id.clone();
    shell.send(message).await?;
    let submitted_at = Utc::now();
    info!(%msg_id, bytes = code.len(), "sent execute_request");

    let stdout = match (iopub.as_mut(), self.capture_timeout) {
      (Some(iopub), Some(limit)) => {
        let mut captured = String::new();
        let collect = async {
          loop {
            let message = iopub.read().await?;
            let is_ours = message
              .parent_header
              .as_ref()
              .is_some_and(|h| h.msg_id == msg_id);
            if !is_ours {
              continue;
            }
            match &message.content {
              JupyterMessageContent::StreamContent(stream) => {
                if matches!(stream.name, Stdio::Stdout) {
                  captured.push_str(&stream.text);
                }
              }
              JupyterMessageContent::Status(status)
                if status.execution_state == ExecutionState::Idle =>
              {
                break;
              }
              _ => {}
            }
          }
          anyhow::Ok(())
        };
        match tokio::time::timeout(limit, collect).await {
          Ok(result) => result?,
          Err(_) => warn!(%msg_id, ?limit, "stdout capture timed out"),
        }
        Some(captured)
      }
      _ => None,
    };

    Ok(ExecutionAck {
      msg_id,
      submitted_at,
      stdout,
    })
  }
}

impl KernelExecutor for JupyterKernel {
  fn execute(&mut self, code: &str) -> anyhow::Result<ExecutionAck> {
    self.runtime.block_on(self.execute_async(code))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntax::{Payload, Token};

  #[derive(Default)]
  struct Recorder {
    sent: Vec<String>,
  }

  impl KernelExecutor for Recorder {
    fn execute(&mut self, code: &str) -> anyhow::Result<ExecutionAck> {
      self.sent.push(code.to_string());
      Ok(ExecutionAck {
        msg_id: format!("msg-{}", self.sent.len()),
        submitted_at: Utc::now(),
        stdout: None,
      })
    }
  }

  #[test]
  fn submit_hands_generated_code_to_the_executor() {
    let lines = vec![CodeLine::new(
      Payload::CustomTokenLine(vec![Token::call("print(1)")]),
      0,
    )];
    let mut recorder = Recorder::default();
    let ack =
      submit(&mut recorder, &lines, &CodegenOptions::default()).unwrap();
    assert_eq!(ack.msg_id, "msg-1");
    assert_eq!(recorder.sent, vec!["print(1)\n".to_string()]);
  }

  #[test]
  fn missing_connection_file_is_an_error() {
    let path = Path::new("/nonexistent/kernel.json");
    let err = JupyterKernel::from_connection_file(path)
      .err()
      .map(|e| e.to_string())
      .unwrap_or_default();
    assert!(err.contains("reading connection file"), "{err}");
  }
}
