use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

use crate::ids::{SegmentId, SourceId};

/// Structured replacement for the three ad hoc `custom_id` string formats
/// the batch pipeline used to produce (`"{source}:{segment}"`,
/// `"flagship:{source}"`, `"remine:{source}:{segment}"`). Every batch
/// request carries one of these; it is parsed exactly once, at
/// result-ingestion time, by [`CustomId::from_str`] — no stage downstream
/// re-derives or re-parses the string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomId {
    Mine {
        source_id: SourceId,
        segment_id: SegmentId,
    },
    Evaluate {
        source_id: SourceId,
    },
    Remine {
        source_id: SourceId,
        segment_id: SegmentId,
    },
}

impl fmt::Display for CustomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomId::Mine { source_id, segment_id } => {
                write!(f, "mine:{source_id}:{segment_id}")
            }
            CustomId::Evaluate { source_id } => write!(f, "evaluate:{source_id}"),
            CustomId::Remine { source_id, segment_id } => {
                write!(f, "remine:{source_id}:{segment_id}")
            }
        }
    }
}

impl FromStr for CustomId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(2, ':');
        let tag = parts.next().context("empty custom_id")?;
        let rest = parts.next().context("custom_id missing payload")?;

        match tag {
            "mine" | "remine" => {
                let (source, segment) = rest
                    .split_once(':')
                    .with_context(|| format!("custom_id '{s}' missing segment component"))?;
                let source_id = SourceId::from(source);
                let segment_id = SegmentId::from(segment);
                if tag == "mine" {
                    Ok(CustomId::Mine { source_id, segment_id })
                } else {
                    Ok(CustomId::Remine { source_id, segment_id })
                }
            }
            "evaluate" => Ok(CustomId::Evaluate {
                source_id: SourceId::from(rest),
            }),
            other => bail!("unrecognized custom_id tag '{other}' in '{s}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        let ids = [
            CustomId::Mine {
                source_id: "ep1".into(),
                segment_id: "seg3".into(),
            },
            CustomId::Evaluate {
                source_id: "ep1".into(),
            },
            CustomId::Remine {
                source_id: "ep1".into(),
                segment_id: "seg3".into(),
            },
        ];
        for id in ids {
            let rendered = id.to_string();
            let parsed: CustomId = rendered.parse().unwrap();
            assert_eq!(parsed, id);
        }
    }

    #[test]
    fn rejects_unknown_tag() {
        assert!("flagship:ep1".parse::<CustomId>().is_err());
    }
}
