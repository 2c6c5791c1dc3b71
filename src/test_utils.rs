//! Shared test utilities: a scripted in-memory [`Vcs`] implementation.
//!
//! `FakeVcs` records every call and plays back configured responses, so
//! pipeline and driver tests can exercise skip, failure, pause, and resume
//! paths without a real server.

use std::collections::{HashMap, VecDeque};

use crate::exec::ExecOutput;
use crate::types::ChangeId;
use crate::vcs::{Interchanges, Opened, Preview, Vcs, VcsError, VcsResult};

/// Builds the fatal error a scripted command failure produces.
pub fn fake_failure(stderr: &str) -> VcsError {
    VcsError::Command {
        output: ExecOutput {
            command: "fake".to_string(),
            exit_code: 1,
            stdout: String::new(),
            stderr: stderr.to_string(),
        },
    }
}

/// Scripted version-control double.
///
/// Defaults describe a healthy server with one candidate change and
/// everything integrable. Tests override per-call results via the queues
/// or make a named operation fail via [`FakeVcs::fail`].
pub struct FakeVcs {
    /// Every operation invoked, in order, by name.
    pub calls: Vec<String>,

    /// Operations that fail with the given stderr text whenever invoked.
    pub failures: HashMap<&'static str, String>,

    /// Queued results for `interchanges`; when empty, one scripted change.
    pub interchanges_results: VecDeque<Interchanges>,

    /// Queued results for `integrate_preview`; when empty, `AllIntegrated`.
    pub preview_results: VecDeque<Preview>,

    /// Queued results for `opened`; when empty, one opened file.
    pub opened_results: VecDeque<Opened>,

    /// The next change number `create_change` hands out.
    pub next_change: u64,

    /// Clients selected via `use_client`.
    pub clients_used: Vec<String>,

    /// Descriptions passed to `create_change`, in order.
    pub descriptions: Vec<String>,

    /// Changes submitted, in order.
    pub submitted: Vec<ChangeId>,

    /// Changes reverted, in order.
    pub reverted: Vec<ChangeId>,

    /// Changes deleted, in order.
    pub deleted: Vec<ChangeId>,
}

impl Default for FakeVcs {
    fn default() -> Self {
        FakeVcs {
            calls: Vec::new(),
            failures: HashMap::new(),
            interchanges_results: VecDeque::new(),
            preview_results: VecDeque::new(),
            opened_results: VecDeque::new(),
            next_change: 1000,
            clients_used: Vec::new(),
            descriptions: Vec::new(),
            submitted: Vec::new(),
            reverted: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl FakeVcs {
    pub fn new() -> Self {
        FakeVcs::default()
    }

    /// Makes `op` fail with `stderr` on every invocation until cleared.
    pub fn fail(&mut self, op: &'static str, stderr: &str) {
        self.failures.insert(op, stderr.to_string());
    }

    /// Clears a scripted failure.
    pub fn heal(&mut self, op: &'static str) {
        self.failures.remove(op);
    }

    /// Number of times `op` was invoked.
    pub fn count(&self, op: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == op).count()
    }

    fn record(&mut self, op: &'static str) -> VcsResult<()> {
        self.calls.push(op.to_string());
        if let Some(stderr) = self.failures.get(op) {
            return Err(fake_failure(stderr));
        }
        Ok(())
    }
}

impl Vcs for FakeVcs {
    fn use_client(&mut self, client: &str) {
        self.clients_used.push(client.to_string());
    }

    fn interchanges(&mut self, _source: &str, _target: &str) -> VcsResult<Interchanges> {
        self.record("interchanges")?;
        Ok(self.interchanges_results.pop_front().unwrap_or_else(|| {
            Interchanges::Changes(vec!["Change 1 by test - scripted change".to_string()])
        }))
    }

    fn integrate_preview(&mut self, _from: &str, _to: &str) -> VcsResult<Preview> {
        self.record("integrate_preview")?;
        Ok(self
            .preview_results
            .pop_front()
            .unwrap_or(Preview::AllIntegrated))
    }

    fn update_client_view(&mut self, _client: &str, _enabled: &[String]) -> VcsResult<()> {
        self.record("update_client_view")
    }

    fn sync(&mut self) -> VcsResult<()> {
        self.record("sync")
    }

    fn create_change(&mut self, description: &str) -> VcsResult<ChangeId> {
        self.record("create_change")?;
        self.descriptions.push(description.to_string());
        let id = ChangeId(self.next_change);
        self.next_change += 1;
        Ok(id)
    }

    fn integrate(&mut self, _source: &str, _target: &str, _change: ChangeId) -> VcsResult<()> {
        self.record("integrate")
    }

    fn resolve(&mut self, _change: ChangeId) -> VcsResult<()> {
        self.record("resolve")
    }

    fn submit(&mut self, change: ChangeId) -> VcsResult<()> {
        self.record("submit")?;
        self.submitted.push(change);
        Ok(())
    }

    fn opened(&mut self, _change: ChangeId) -> VcsResult<Opened> {
        self.record("opened")?;
        Ok(self
            .opened_results
            .pop_front()
            .unwrap_or_else(|| Opened::Files(vec!["//depot/main/a.c#1 - integrate".to_string()])))
    }

    fn revert(&mut self, change: ChangeId) -> VcsResult<()> {
        self.record("revert")?;
        self.reverted.push(change);
        Ok(())
    }

    fn delete_change(&mut self, change: ChangeId) -> VcsResult<()> {
        self.record("delete_change")?;
        self.deleted.push(change);
        Ok(())
    }
}
