//! Per-operation timeouts and deadlines.

use crate::error::{Error, Result};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_CREATE: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_READ: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_UPDATE: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_DELETE: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            create: DEFAULT_CREATE,
            read: DEFAULT_READ,
            update: DEFAULT_UPDATE,
            delete: DEFAULT_DELETE,
        }
    }
}

impl Timeouts {
    /// Apply a `timeouts { create = "45m" }` attribute block.
    pub fn with_overrides(mut self, block: Option<&Value>) -> Result<Self> {
        let Some(Value::Object(block)) = block else {
            return Ok(self);
        };
        for (key, value) in block {
            let Some(raw) = value.as_str() else {
                continue;
            };
            let duration = parse_duration(raw)?;
            match key.as_str() {
                "create" => self.create = duration,
                "read" => self.read = duration,
                "update" => self.update = duration,
                "delete" => self.delete = duration,
                other => {
                    return Err(Error::Validation(format!(
                        "timeouts: unsupported operation {other:?}"
                    )))
                }
            }
        }
        Ok(self)
    }
}

/// Nanoseconds per duration unit.
const UNITS: &[(&str, u64)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

/// Parse Go style durations: `"90s"`, `"1h30m"`, `"1.5h"`, `"500ms"`, `"10us"`.
///
/// Negative durations are rejected, as is anything past `i64::MAX`
/// nanoseconds.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = || Error::Validation(format!("time: invalid duration {input:?}"));
    let mut rest = input.trim();
    rest = rest.strip_prefix('+').unwrap_or(rest);
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    while !rest.is_empty() {
        let whole_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (whole, tail) = rest.split_at(whole_len);
        let (fraction, tail) = match tail.strip_prefix('.') {
            Some(tail) => tail.split_at(tail.find(|c: char| !c.is_ascii_digit()).unwrap_or(tail.len())),
            None => ("", tail),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let unit = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, nanos)| *nanos)
            .ok_or_else(|| Error::Validation(format!("time: missing or unknown unit {unit:?} in duration {input:?}")))?;

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut nanos = whole.checked_mul(unit).ok_or_else(invalid)?;
        if !fraction.is_empty() {
            let digits = &fraction[..fraction.len().min(18)];
            let scale = 10u128.pow(digits.len() as u32);
            let numerator: u128 = digits.parse().map_err(|_| invalid())?;
            let extra = u64::try_from(numerator * u128::from(unit) / scale).map_err(|_| invalid())?;
            nanos = nanos.checked_add(extra).ok_or_else(invalid)?;
        }
        total = total.checked_add(nanos).ok_or_else(invalid)?;
        rest = tail;
    }

    if total > i64::MAX as u64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(total))
}

/// The deadline of a single CRUD operation.
///
/// A context without a deadline only exists for callers that opt out of
/// timeouts; handlers that require one (nested item deletion) reject it.
#[derive(Debug, Clone, Copy)]
pub struct OperationContext {
    deadline: Option<Instant>,
    timeout: Duration,
}

impl OperationContext {
    pub fn with_timeout(timeout: Duration) -> Self {
        OperationContext {
            deadline: Instant::now().checked_add(timeout),
            timeout,
        }
    }

    pub fn background() -> Self {
        OperationContext {
            deadline: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn for_create(timeouts: &Timeouts) -> Self {
        Self::with_timeout(timeouts.create)
    }

    pub fn for_read(timeouts: &Timeouts) -> Self {
        Self::with_timeout(timeouts.read)
    }

    pub fn for_update(timeouts: &Timeouts) -> Self {
        Self::with_timeout(timeouts.update)
    }

    pub fn for_delete(timeouts: &Timeouts) -> Self {
        Self::with_timeout(timeouts.delete)
    }

    pub fn for_create_update(timeouts: &Timeouts, is_new_resource: bool) -> Self {
        if is_new_resource {
            Self::for_create(timeouts)
        } else {
            Self::for_update(timeouts)
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time left before the deadline; `Duration::MAX` without one.
    pub fn remaining(&self) -> Duration {
        match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some() && self.remaining().is_zero()
    }

    /// Run `fut`, failing once the deadline passes.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| Error::DeadlineExceeded(self.timeout))?,
            None => fut.await,
        }
    }
}
