//! Subprocess-backed [`Vcs`] implementation.
//!
//! Drives a Perforce-style command-line front end. Every call runs one
//! synchronous command, classifies its output via [`crate::exec`], and maps
//! the result onto the engine's outcome enums. The binary name is
//! configurable so deployments and tests can point at any compatible front
//! end.

use std::sync::LazyLock;

use regex::Regex;

use super::{Interchanges, Opened, Preview, Vcs, VcsError, VcsResult};
use crate::exec::{self, CommandOutcome, ExecOutput, patterns};
use crate::types::ChangeId;

/// "Change 12345 created." — printed when a change form is accepted.
static CHANGE_CREATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Change (\d+) created").unwrap());

/// "already integrated" appearing on stdout of a dry-run preview.
static STDOUT_ALREADY_INTEGRATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[Aa]ll revision\(s\) already integrated").unwrap());

/// Command-line client for the version-control server.
#[derive(Debug, Clone)]
pub struct CliVcs {
    bin: String,
    current_client: Option<String>,
}

impl CliVcs {
    pub fn new(bin: impl Into<String>) -> Self {
        CliVcs {
            bin: bin.into(),
            current_client: None,
        }
    }

    fn run(&self, args: &[&str], stdin: Option<&str>) -> VcsResult<ExecOutput> {
        let mut full: Vec<&str> = Vec::new();
        if let Some(client) = &self.current_client {
            full.push("-c");
            full.push(client);
        }
        full.extend_from_slice(args);
        Ok(exec::run_with_stdin(&self.bin, &full, stdin)?)
    }

    /// Runs a command and classifies it, turning a fatal classification
    /// into a [`VcsError::Command`] carrying the raw output.
    fn run_classified(
        &self,
        args: &[&str],
        stdin: Option<&str>,
        benign: &[&Regex],
    ) -> VcsResult<CommandOutcome> {
        let output = self.run(args, stdin)?;
        match exec::classify(output, benign) {
            CommandOutcome::Fatal(output) => Err(VcsError::Command { output }),
            ok => Ok(ok),
        }
    }
}

impl Vcs for CliVcs {
    fn use_client(&mut self, client: &str) {
        self.current_client = Some(client.to_string());
    }

    fn interchanges(&mut self, source: &str, target: &str) -> VcsResult<Interchanges> {
        let outcome = self.run_classified(
            &["interchanges", "-l", source, target],
            None,
            &[
                &patterns::NOTHING_TO_INTEGRATE,
                &patterns::ALREADY_INTEGRATED,
                &patterns::SCAN_LIMIT,
            ],
        )?;

        Ok(match outcome {
            CommandOutcome::BenignNoop(output) => {
                if patterns::SCAN_LIMIT.is_match(&output.stderr) {
                    Interchanges::ScanLimited
                } else {
                    Interchanges::Nothing
                }
            }
            CommandOutcome::Success(output) => {
                let lines = nonempty_lines(&output.stdout);
                if lines.is_empty() {
                    Interchanges::Nothing
                } else {
                    Interchanges::Changes(lines)
                }
            }
            CommandOutcome::Fatal(_) => unreachable!("fatal handled by run_classified"),
        })
    }

    fn integrate_preview(&mut self, from: &str, to: &str) -> VcsResult<Preview> {
        let outcome = self.run_classified(
            &["integrate", "-n", from, to],
            None,
            &[&patterns::ALREADY_INTEGRATED],
        )?;

        Ok(match outcome {
            CommandOutcome::BenignNoop(_) => Preview::AllIntegrated,
            CommandOutcome::Success(output) => {
                if STDOUT_ALREADY_INTEGRATED.is_match(&output.stdout) {
                    Preview::AllIntegrated
                } else {
                    Preview::Pending(nonempty_lines(&output.stdout))
                }
            }
            CommandOutcome::Fatal(_) => unreachable!("fatal handled by run_classified"),
        })
    }

    fn update_client_view(&mut self, client: &str, enabled: &[String]) -> VcsResult<()> {
        self.use_client(client);

        let outcome = self.run_classified(&["client", "-o", client], None, &[])?;
        let spec = filter_view(&outcome.output().stdout, enabled);

        self.run_classified(&["client", "-i"], Some(&spec), &[])?;
        tracing::info!(client, enabled = enabled.len(), "client view updated");
        Ok(())
    }

    fn sync(&mut self) -> VcsResult<()> {
        self.run_classified(&["sync"], None, &[&patterns::UP_TO_DATE])?;
        Ok(())
    }

    fn create_change(&mut self, description: &str) -> VcsResult<ChangeId> {
        let form = self.run_classified(&["change", "-o"], None, &[])?;
        let filled = set_form_description(&form.output().stdout, description);

        let outcome = self.run_classified(&["change", "-i"], Some(&filled), &[])?;
        let output = outcome.output();

        let Some(number) = CHANGE_CREATED
            .captures(&output.stdout)
            .and_then(|caps| caps[1].parse::<u64>().ok())
        else {
            return Err(VcsError::Parse {
                detail: "no change number in creation output".to_string(),
                output: output.clone(),
            });
        };

        tracing::info!(change = number, "pending change created");
        Ok(ChangeId(number))
    }

    fn integrate(&mut self, source: &str, target: &str, change: ChangeId) -> VcsResult<()> {
        let change_arg = change.to_string();
        self.run_classified(&["integrate", "-c", &change_arg, source, target], None, &[])?;
        Ok(())
    }

    fn resolve(&mut self, _change: ChangeId) -> VcsResult<()> {
        // Auto-resolve only; conflicting files stay unresolved and make the
        // later submit fail rather than guessing a merge.
        self.run_classified(&["resolve", "-am"], None, &[&patterns::NOTHING_TO_RESOLVE])?;
        Ok(())
    }

    fn submit(&mut self, change: ChangeId) -> VcsResult<()> {
        let change_arg = change.to_string();
        self.run_classified(&["submit", "-c", &change_arg], None, &[])?;
        tracing::info!(change = change.0, "change submitted");
        Ok(())
    }

    fn opened(&mut self, change: ChangeId) -> VcsResult<Opened> {
        let change_arg = change.to_string();
        let outcome = self.run_classified(
            &["opened", "-c", &change_arg],
            None,
            &[&patterns::NOTHING_OPENED],
        )?;

        Ok(match outcome {
            CommandOutcome::BenignNoop(_) => Opened::Nothing,
            CommandOutcome::Success(output) => {
                let lines = nonempty_lines(&output.stdout);
                if lines.is_empty() {
                    Opened::Nothing
                } else {
                    Opened::Files(lines)
                }
            }
            CommandOutcome::Fatal(_) => unreachable!("fatal handled by run_classified"),
        })
    }

    fn revert(&mut self, change: ChangeId) -> VcsResult<()> {
        let change_arg = change.to_string();
        self.run_classified(
            &["revert", "-c", &change_arg, "//..."],
            None,
            &[&patterns::NOTHING_OPENED],
        )?;
        Ok(())
    }

    fn delete_change(&mut self, change: ChangeId) -> VcsResult<()> {
        let change_arg = change.to_string();
        self.run_classified(&["change", "-d", &change_arg], None, &[])?;
        Ok(())
    }
}

fn nonempty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect()
}

/// Rewrites the View section of a client spec so only mappings whose depot
/// side matches one of the `enabled` prefixes remain active.
///
/// A pattern like `//depot/main/...` enables every mapping under
/// `//depot/main/`. All other sections of the spec pass through untouched.
pub fn filter_view(spec: &str, enabled: &[String]) -> String {
    let prefixes: Vec<&str> = enabled
        .iter()
        .map(|p| p.strip_suffix("...").unwrap_or(p))
        .collect();

    let mut out = String::new();
    let mut in_view = false;
    for line in spec.lines() {
        if line.starts_with("View:") {
            in_view = true;
            out.push_str(line);
            out.push('\n');
            continue;
        }

        if in_view {
            if line.starts_with('\t') || line.starts_with(' ') {
                let depot_side = line.trim().split_whitespace().next().unwrap_or("");
                if prefixes.iter().any(|p| depot_side.starts_with(p)) {
                    out.push_str(line);
                    out.push('\n');
                }
                continue;
            }
            in_view = false;
        }

        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Replaces the Description section of a change form with `description`,
/// indenting each line as the form format requires.
pub fn set_form_description(form: &str, description: &str) -> String {
    let mut out = String::new();
    let mut lines = form.lines().peekable();
    let mut replaced = false;

    while let Some(line) = lines.next() {
        if line.starts_with("Description:") {
            out.push_str("Description:\n");
            for desc_line in description.lines() {
                out.push('\t');
                out.push_str(desc_line);
                out.push('\n');
            }
            // Skip the old indented block.
            while lines
                .peek()
                .is_some_and(|l| l.starts_with('\t') || l.starts_with(' ') || l.is_empty())
            {
                let skipped = lines.next().unwrap_or_default();
                // A blank line followed by a new field ends the block.
                if skipped.is_empty()
                    && lines
                        .peek()
                        .is_some_and(|l| !l.starts_with('\t') && !l.starts_with(' '))
                {
                    out.push('\n');
                    break;
                }
            }
            replaced = true;
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }

    if !replaced {
        out.push_str("Description:\n");
        for desc_line in description.lines() {
            out.push('\t');
            out.push_str(desc_line);
            out.push('\n');
        }
    }
    out
}
