use std::fmt;

use dpp_ledger::HashClass;
use dpp_types::{Digest, RecordId};
use serde::{Serialize, Serializer};

use crate::error::VerifyResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Valid,
    Mismatch,
}

/// A pair of values that failed to agree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Disagreement {
    ComputedOnChain,
    OnChainClaimed,
    ClaimedComputed,
}

impl fmt::Display for Disagreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ComputedOnChain => "computed != on-chain",
            Self::OnChainClaimed => "on-chain != claimed",
            Self::ClaimedComputed => "claimed != computed",
        })
    }
}

/// Outcome of one three-way comparison.
///
/// Serializes as `{valid, computed, onChain, claimed}` plus the class,
/// record, and version it covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationReport {
    pub class: HashClass,
    pub record: RecordId,
    pub version: Option<u64>,
    pub verdict: Verdict,
    pub computed: Digest,
    pub on_chain: Digest,
    pub claimed: Digest,
}

impl VerificationReport {
    /// Build a report; the verdict is `Valid` iff all three values agree.
    pub fn new(
        class: HashClass,
        record: RecordId,
        version: Option<u64>,
        computed: Digest,
        on_chain: Digest,
        claimed: Digest,
    ) -> Self {
        let verdict = if computed == on_chain && on_chain == claimed {
            Verdict::Valid
        } else {
            Verdict::Mismatch
        };
        Self {
            class,
            record,
            version,
            verdict,
            computed,
            on_chain,
            claimed,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.verdict == Verdict::Valid
    }

    /// Which pairs disagree. Empty for a valid report.
    pub fn disagreements(&self) -> Vec<Disagreement> {
        let mut out = Vec::new();
        if self.computed != self.on_chain {
            out.push(Disagreement::ComputedOnChain);
        }
        if self.on_chain != self.claimed {
            out.push(Disagreement::OnChainClaimed);
        }
        if self.claimed != self.computed {
            out.push(Disagreement::ClaimedComputed);
        }
        out
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportJson<'a> {
    class: HashClass,
    record: &'a RecordId,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<u64>,
    valid: bool,
    computed: &'a Digest,
    on_chain: &'a Digest,
    claimed: &'a Digest,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    disagreements: Vec<Disagreement>,
}

impl Serialize for VerificationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ReportJson {
            class: self.class,
            record: &self.record,
            version: self.version,
            valid: self.is_valid(),
            computed: &self.computed,
            on_chain: &self.on_chain,
            claimed: &self.claimed,
            disagreements: self.disagreements(),
        }
        .serialize(serializer)
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hash of {}", self.class, self.record)?;
        if let Some(v) = self.version {
            write!(f, " version {v}")?;
        }
        match self.verdict {
            Verdict::Valid => write!(f, ": valid"),
            Verdict::Mismatch => {
                let pairs: Vec<String> =
                    self.disagreements().iter().map(ToString::to_string).collect();
                write!(f, ": mismatch ({})", pairs.join(", "))
            }
        }
    }
}

/// The three observable outcomes of a verification call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntegrityStatus {
    Valid,
    Mismatch,
    /// Integrity could not be determined.
    Error(String),
}

impl IntegrityStatus {
    pub fn of(result: &VerifyResult<VerificationReport>) -> Self {
        match result {
            Ok(report) if report.is_valid() => Self::Valid,
            Ok(_) => Self::Mismatch,
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

impl fmt::Display for IntegrityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("valid"),
            Self::Mismatch => f.write_str("mismatch"),
            Self::Error(e) => write!(f, "error: {e}"),
        }
    }
}
