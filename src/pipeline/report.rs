//! Rejection reasons and per-run accounting.

use std::fmt;

use thiserror::Error;

use crate::error::MoveError;
use crate::legality::Phase;

/// Why a record was left out of the dataset.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectReason {
    #[error("game length {length} too short")]
    Short { length: usize, min: usize },
    #[error("duplicate game")]
    Duplicate,
    #[error("{error} ({phase:?} #{index})")]
    Illegal {
        phase: Phase,
        index: usize,
        error: MoveError,
    },
    #[error("player {player:?} matched blacklist regexp {pattern:?}")]
    Blacklisted { player: String, pattern: String },
    #[error("player {player:?} appeared too frequently")]
    TopCut { player: String },
    #[error("parse failed: {0}")]
    ParseFailed(String),
}

/// Reporting bucket of a [`RejectReason`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RejectCategory {
    Short,
    Duplicate,
    Illegal,
    Blacklisted,
    ParseFailed,
}

impl RejectReason {
    pub fn category(&self) -> RejectCategory {
        match self {
            RejectReason::Short { .. } => RejectCategory::Short,
            RejectReason::Duplicate => RejectCategory::Duplicate,
            RejectReason::Illegal { .. } => RejectCategory::Illegal,
            RejectReason::Blacklisted { .. } | RejectReason::TopCut { .. } => {
                RejectCategory::Blacklisted
            }
            RejectReason::ParseFailed(_) => RejectCategory::ParseFailed,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RejectionCounts {
    pub short: usize,
    pub duplicate: usize,
    pub illegal: usize,
    pub blacklisted: usize,
    /// Of `blacklisted`, how many were excluded as too-frequent players.
    pub top_cut: usize,
    pub parse_failed: usize,
}

impl RejectionCounts {
    pub fn record(&mut self, reason: &RejectReason) {
        if matches!(reason, RejectReason::TopCut { .. }) {
            self.top_cut += 1;
        }
        *self.slot(reason.category()) += 1;
    }

    pub fn get(&self, category: RejectCategory) -> usize {
        match category {
            RejectCategory::Short => self.short,
            RejectCategory::Duplicate => self.duplicate,
            RejectCategory::Illegal => self.illegal,
            RejectCategory::Blacklisted => self.blacklisted,
            RejectCategory::ParseFailed => self.parse_failed,
        }
    }

    fn slot(&mut self, category: RejectCategory) -> &mut usize {
        match category {
            RejectCategory::Short => &mut self.short,
            RejectCategory::Duplicate => &mut self.duplicate,
            RejectCategory::Illegal => &mut self.illegal,
            RejectCategory::Blacklisted => &mut self.blacklisted,
            RejectCategory::ParseFailed => &mut self.parse_failed,
        }
    }

    pub fn merge(&mut self, other: &RejectionCounts) {
        self.short += other.short;
        self.duplicate += other.duplicate;
        self.illegal += other.illegal;
        self.blacklisted += other.blacklisted;
        self.top_cut += other.top_cut;
        self.parse_failed += other.parse_failed;
    }

    pub fn total(&self) -> usize {
        self.short + self.duplicate + self.illegal + self.blacklisted + self.parse_failed
    }
}

impl fmt::Display for RejectionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "short {}, duplicate {}, illegal {}, blacklisted {} (top cut {}), failed {}",
            self.short,
            self.duplicate,
            self.illegal,
            self.blacklisted,
            self.top_cut,
            self.parse_failed
        )
    }
}

/// Summary of one archive run, or of several merged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Records read from the source, including malformed ones.
    pub read: usize,
    /// Records dropped by sampling. Not counted as rejections.
    pub sampled_out: usize,
    /// Records handed to the sink.
    pub accepted: usize,
    pub rejected: RejectionCounts,
    /// The run stopped early. Accepted counts what was committed before.
    pub cancelled: bool,
}

impl PipelineReport {
    pub fn merge(&mut self, other: &PipelineReport) {
        self.read += other.read;
        self.sampled_out += other.sampled_out;
        self.accepted += other.accepted;
        self.rejected.merge(&other.rejected);
        self.cancelled |= other.cancelled;
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "read {}, accepted {}, rejected {} ({})",
            self.read,
            self.accepted,
            self.rejected.total(),
            self.rejected
        )?;
        if self.sampled_out > 0 {
            write!(f, ", sampled out {}", self.sampled_out)?;
        }
        if self.cancelled {
            write!(f, ", cancelled")?;
        }
        Ok(())
    }
}
