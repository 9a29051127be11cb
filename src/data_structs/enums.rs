use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sequencing mode of a run, derived from which dataset file described it.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, PartialOrd, Ord)]
pub enum RunMode {
    /// Circular consensus (HiFi) run, described by a ConsensusReadSet.
    CcsHifi,
    /// Continuous long read run, described by a SubreadSet.
    Clr,
}

impl RunMode {
    /// String form used in the persisted table.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RunMode::CcsHifi => "CCS/HiFi",
            RunMode::Clr => "CLR",
        }
    }
}

impl Display for RunMode {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CCS/HIFI" | "CCS" | "HIFI" => Ok(RunMode::CcsHifi),
            "CLR" => Ok(RunMode::Clr),
            other => Err(format!("unknown run mode: {}", other)),
        }
    }
}

impl Serialize for RunMode {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer, {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RunMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>, {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Which read set the yield figure of a record derives from.
///
/// The distinction matters: the quality-filtered (HiFi) read set is
/// roughly a third of the unfiltered total, so selecting the wrong
/// reference silently changes the yield by ~3x. The flag is carried into
/// the persisted table so downstream consumers can filter on it instead
/// of trusting a possibly-wrong value.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, PartialOrd, Ord)]
pub enum YieldSource {
    /// Reads meeting the minimum quality threshold (`*.hifi_reads.bam`).
    Filtered,
    /// The unfiltered total (`*.reads.bam` / `*.subreads.bam`).
    Unfiltered,
}

impl YieldSource {
    pub const fn is_filtered(&self) -> bool {
        matches!(self, YieldSource::Filtered)
    }
}

impl Display for YieldSource {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            YieldSource::Filtered => write!(f, "filtered"),
            YieldSource::Unfiltered => write!(f, "unfiltered"),
        }
    }
}

impl Serialize for YieldSource {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer, {
        serializer.serialize_bool(self.is_filtered())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_roundtrip() {
        assert_eq!("CCS/HiFi".parse::<RunMode>().unwrap(), RunMode::CcsHifi);
        assert_eq!("clr".parse::<RunMode>().unwrap(), RunMode::Clr);
        assert_eq!(RunMode::CcsHifi.to_string(), "CCS/HiFi");
        assert!("nanopore".parse::<RunMode>().is_err());
    }

    #[test]
    fn yield_source_flag() {
        assert!(YieldSource::Filtered.is_filtered());
        assert!(!YieldSource::Unfiltered.is_filtered());
    }
}
