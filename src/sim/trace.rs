use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sim::error::TraceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpKind {
    Read,
    Write,
}

impl FromStr for OpKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("read") {
            Ok(Self::Read)
        } else if value.eq_ignore_ascii_case("write") {
            Ok(Self::Write)
        } else {
            Err(format!(
                "unknown operation '{}', expected one of: READ, WRITE",
                value
            ))
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Read => write!(f, "READ"),
            OpKind::Write => write!(f, "WRITE"),
        }
    }
}

/// One demand access from the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemOp {
    pub kind: OpKind,
    pub addr: u64,
}

impl MemOp {
    pub fn read(addr: u64) -> Self {
        Self {
            kind: OpKind::Read,
            addr,
        }
    }

    pub fn write(addr: u64) -> Self {
        Self {
            kind: OpKind::Write,
            addr,
        }
    }

    pub fn is_read(&self) -> bool {
        self.kind == OpKind::Read
    }
}

impl fmt::Display for MemOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:#x}", self.kind, self.addr)
    }
}

fn parse_addr(token: &str) -> Result<u64, String> {
    if token.starts_with('-') {
        return Err(format!("negative address '{}'", token));
    }
    let parsed = match token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => token.parse::<u64>(),
    };
    parsed.map_err(|err| format!("bad address '{}': {}", token, err))
}

fn parse_line(line: &str) -> Result<MemOp, String> {
    let mut fields = line.split_whitespace();
    let (Some(op), Some(addr)) = (fields.next(), fields.next()) else {
        return Err(format!("expected '<op> <addr>', got '{}'", line));
    };
    if let Some(extra) = fields.next() {
        return Err(format!("unexpected trailing field '{}'", extra));
    }
    Ok(MemOp {
        kind: op.parse()?,
        addr: parse_addr(addr)?,
    })
}

/// Lazily parses a text trace: one `<op> <addr>` per line, `#` starts a comment.
///
/// Each item carries the 1-based index of the entry so a run can abort at the exact offending
/// record.
pub fn parse_trace(text: &str) -> impl Iterator<Item = Result<MemOp, TraceError>> + '_ {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(idx, line)| parse_line(line).map_err(|reason| TraceError::new(idx + 1, reason)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ops_and_addresses() {
        let ops: Vec<_> = parse_trace("READ 0x1000\nwrite 128\n  Read 0X80  \n")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            ops,
            vec![MemOp::read(0x1000), MemOp::write(128), MemOp::read(0x80)]
        );
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let ops: Vec<_> = parse_trace("# header\n\nREAD 0 # first\n\nREAD 128\n")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(ops, vec![MemOp::read(0), MemOp::read(128)]);
    }

    #[test]
    fn unknown_op_reports_entry() {
        let err = parse_trace("READ 0\nFLUSH 64\n")
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert_eq!(err.entry, 2);
        assert!(err.reason.contains("FLUSH"));
    }

    #[test]
    fn negative_address_rejected() {
        let err = parse_trace("WRITE -128").next().unwrap().unwrap_err();
        assert_eq!(err.entry, 1);
        assert!(err.reason.contains("negative"));
    }

    #[test]
    fn malformed_lines_rejected() {
        assert!(parse_trace("READ").next().unwrap().is_err());
        assert!(parse_trace("READ 0 1").next().unwrap().is_err());
        assert!(parse_trace("READ 0xzz").next().unwrap().is_err());
    }

    #[test]
    fn wide_addresses_fit() {
        let op = parse_trace("READ 0xffffffffffff").next().unwrap().unwrap();
        assert_eq!(op.addr, (1u64 << 48) - 1);
    }

    #[test]
    fn display_round_trips_through_parser() {
        let op = MemOp::write(0xdead_beef);
        let text = op.to_string();
        assert_eq!(text, "WRITE 0xdeadbeef");
        assert_eq!(parse_trace(&text).next().unwrap().unwrap(), op);
    }
}
