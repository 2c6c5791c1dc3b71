//! Known benign stderr patterns from the version-control server.
//!
//! The server reports many nothing-to-do conditions on stderr with exit
//! code 0, which would otherwise be indistinguishable from real failures.
//! Every such message variant the engine tolerates is listed here, and only
//! here; call sites pick the subset that applies to their action.
//!
//! New variants show up with server upgrades and are the most common source
//! of false failures, so keep this table the single point of extension.

use std::sync::LazyLock;

use regex::Regex;

fn pattern(source: &str) -> Regex {
    // The table is all static literals; a bad pattern is a programmer error.
    Regex::new(source).unwrap_or_else(|err| panic!("invalid benign pattern {source:?}: {err}"))
}

/// "All revision(s) already integrated." — integration preview or submit
/// attempt found the target fully caught up.
pub static ALREADY_INTEGRATED: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"[Aa]ll revision\(s\) already integrated"));

/// "No file(s) to integrate." — the interchanges query has no candidate
/// changes between the branches.
pub static NOTHING_TO_INTEGRATE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"[Nn]o file\(s\) to integrate"));

/// "No file(s) to resolve." — auto-resolve had nothing left to do.
pub static NOTHING_TO_RESOLVE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"[Nn]o file\(s\) to resolve"));

/// "File(s) not opened anywhere." / "...not opened on this client." —
/// the pending change has no opened files.
pub static NOTHING_OPENED: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"[Ff]ile\(s\) not opened (anywhere|on this client)"));

/// "File(s) up-to-date." — sync found the workspace already current.
pub static UP_TO_DATE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"[Ff]ile\(s\) up-to-date"));

/// "Too many rows scanned ..." — the server refused to enumerate the full
/// interchanges history. Degraded, not fatal: the description falls back
/// to a placeholder.
pub static SCAN_LIMIT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"[Tt]oo many rows scanned"));
