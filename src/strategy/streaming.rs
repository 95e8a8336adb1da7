//! Streaming Construction
//!
//! Runs the event source on a dedicated, named thread. The thread owns the
//! builder; readers share the document through its `Arc`ed tables.

use std::thread::JoinHandle;

use crate::error::{Result, TreeError};

const THREAD_NAME: &str = "streamxml-builder";

/// Outcome of a construction run
///
/// For streaming builds this wraps the producer thread; joining waits for
/// it. Synchronous builds return an already finished handle.
#[derive(Debug)]
pub struct BuildHandle {
    inner: Inner,
}

#[derive(Debug)]
enum Inner {
    Finished(Result<()>),
    Running(JoinHandle<Result<()>>),
}

impl BuildHandle {
    pub(crate) fn finished(result: Result<()>) -> Self {
        BuildHandle {
            inner: Inner::Finished(result),
        }
    }

    /// The producer has stopped (successfully or not)
    pub fn is_finished(&self) -> bool {
        match &self.inner {
            Inner::Finished(_) => true,
            Inner::Running(handle) => handle.is_finished(),
        }
    }

    /// Wait for the producer and report how construction ended
    pub fn join(self) -> Result<()> {
        match self.inner {
            Inner::Finished(result) => result,
            Inner::Running(handle) => handle.join().unwrap_or_else(|_| {
                Err(TreeError::Construction("builder thread panicked".to_string()))
            }),
        }
    }
}

/// Start `work` on the builder thread
pub(crate) fn spawn<F>(work: F) -> Result<BuildHandle>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    let handle = std::thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || {
            log::debug!("builder thread started");
            let result = work();
            if let Err(err) = &result {
                log::debug!("builder thread stopped: {}", err);
            }
            result
        })?;
    Ok(BuildHandle {
        inner: Inner::Running(handle),
    })
}
