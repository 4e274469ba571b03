//! Agent Buffer (C8).
//!
//! Active only while Mode::Agent. Accumulates final-transcript text with a
//! silence-debounced flush timer, then dispatches the buffered prompt to an
//! external shell command (spec.md §4.8). Subprocess handling is grounded in
//! `CambrianTech-continuum`'s sentinel shell step, adapted from a
//! wait-for-full-output call to a streaming one so stdout/stderr reach the
//! host as the subprocess produces them.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::settings::AgentSettings;

pub struct AgentBuffer {
    text: Mutex<String>,
    pending_flush: Mutex<Option<JoinHandle<()>>>,
    command_template: String,
    timeout: Duration,
    runtime: Handle,
}

impl AgentBuffer {
    pub fn new(settings: &AgentSettings, runtime: Handle) -> Self {
        Self {
            text: Mutex::new(String::new()),
            pending_flush: Mutex::new(None),
            command_template: settings.agent_command_template.clone(),
            timeout: Duration::from_secs_f32(settings.agent_buffer_timeout),
            runtime,
        }
    }

    /// Append one final transcript with a single-space separator (no
    /// separator on the first write), then cancel and re-arm the flush
    /// timer (spec.md §4.8 steps 1-3).
    pub fn append(self: &Arc<Self>, chunk: &str) {
        {
            let mut text = self.text.lock().unwrap();
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(chunk);
        }
        self.rearm_flush_timer();
    }

    fn rearm_flush_timer(self: &Arc<Self>) {
        if let Some(handle) = self.pending_flush.lock().unwrap().take() {
            handle.abort();
        }
        let this = Arc::clone(self);
        let timeout = self.timeout;
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            this.flush().await;
        });
        *self.pending_flush.lock().unwrap() = Some(handle);
    }

    /// Disarm handling (spec.md §4.7): discard any partially-buffered text
    /// and cancel the pending flush without dispatching anything.
    pub fn discard(&self) {
        self.text.lock().unwrap().clear();
        if let Some(handle) = self.pending_flush.lock().unwrap().take() {
            handle.abort();
        }
    }

    async fn flush(&self) {
        let text = {
            let mut guard = self.text.lock().unwrap();
            std::mem::take(&mut *guard)
        };
        if text.is_empty() {
            return;
        }
        if self.command_template.is_empty() {
            crate::warn!("agent buffer flushed but agent_command_template is empty, dropping prompt");
            return;
        }

        let command = self.command_template.replace("$PROMPT", &text);
        if let Err(err) = run_subprocess(&command).await {
            crate::error!("agent subprocess failed to spawn: {err}");
        }
    }
}

/// Spawn `command` through `/bin/sh -c`, streaming stdout/stderr to the
/// host's own stdout as it arrives, and await the exit code. A non-zero
/// exit is logged, not retried (spec.md §4.8, §7).
async fn run_subprocess(command: &str) -> anyhow::Result<()> {
    crate::info!("agent: spawning `{command}`");

    let mut child = Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    let stdout_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            println!("{line}");
        }
    });
    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            println!("{line}");
        }
    });

    let status = child.wait().await?;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    if !status.success() {
        crate::warn!("agent subprocess exited with {status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(timeout: f32, template: &str) -> AgentSettings {
        AgentSettings {
            agent_buffer_timeout: timeout,
            agent_command_template: template.to_string(),
        }
    }

    #[tokio::test]
    async fn first_append_has_no_leading_separator() {
        let buffer = Arc::new(AgentBuffer::new(&settings(5.0, ""), Handle::current()));
        buffer.append("run report");
        assert_eq!(buffer.text.lock().unwrap().as_str(), "run report");
    }

    #[tokio::test]
    async fn subsequent_appends_join_with_single_space() {
        let buffer = Arc::new(AgentBuffer::new(&settings(5.0, ""), Handle::current()));
        buffer.append("run report");
        buffer.append("on prod");
        assert_eq!(buffer.text.lock().unwrap().as_str(), "run report on prod");
    }

    #[tokio::test]
    async fn discard_clears_buffer_and_cancels_timer() {
        let buffer = Arc::new(AgentBuffer::new(&settings(5.0, ""), Handle::current()));
        buffer.append("run report");
        buffer.discard();
        assert!(buffer.text.lock().unwrap().is_empty());
        assert!(buffer.pending_flush.lock().unwrap().is_none());
    }

    // spec.md §4.8: a later utterance re-arms the timer rather than
    // letting an earlier one fire independently.
    #[tokio::test(start_paused = true)]
    async fn second_append_resets_the_flush_deadline() {
        let buffer = Arc::new(AgentBuffer::new(&settings(0.1, "true"), Handle::current()));
        buffer.append("first");
        tokio::time::advance(Duration::from_millis(80)).await;
        buffer.append("second");
        tokio::time::advance(Duration::from_millis(80)).await;
        // Had the first timer not been cancelled, the buffer would have
        // flushed (and cleared) before "second" was appended.
        assert_eq!(buffer.text.lock().unwrap().as_str(), "first second");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_and_clears_the_buffer() {
        let buffer = Arc::new(AgentBuffer::new(&settings(0.05, "true"), Handle::current()));
        buffer.append("run report");
        tokio::time::advance(Duration::from_secs(1)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(buffer.text.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_template_skips_dispatch_without_panicking() {
        let buffer = Arc::new(AgentBuffer::new(&settings(5.0, ""), Handle::current()));
        buffer.append("run report");
        buffer.flush().await;
        assert!(buffer.text.lock().unwrap().is_empty());
    }
}
