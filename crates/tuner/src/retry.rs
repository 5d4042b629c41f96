//! Bounded retry with temperature escalation.

use serde::{Deserialize, Serialize};

/// How many attempts an iteration gets and how temperature rises between them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub start_temperature: f64,
    /// Added after every failed attempt.
    pub temperature_step: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            start_temperature: 0.4,
            temperature_step: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Temperature of the 1-based attempt `number`.
    pub fn temperature(&self, number: u32) -> f64 {
        self.start_temperature + self.temperature_step * number.saturating_sub(1) as f64
    }
}

/// One try within a retry budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attempt {
    /// 1-based.
    pub number: u32,
    pub remaining: u32,
    pub temperature: f64,
}

/// Every attempt failed.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Call `f` until it succeeds or `policy.max_attempts` calls have failed.
///
/// A budget of zero is treated as one attempt.
pub fn attempt<T, E>(
    policy: &RetryPolicy,
    mut f: impl FnMut(Attempt) -> Result<T, E>,
) -> Result<T, RetryExhausted<E>> {
    let budget = policy.max_attempts.max(1);
    let mut number = 1;
    loop {
        let current = Attempt {
            number,
            remaining: budget - number,
            temperature: policy.temperature(number),
        };
        match f(current) {
            Ok(value) => return Ok(value),
            Err(last_error) if number == budget => {
                return Err(RetryExhausted {
                    attempts: number,
                    last_error,
                })
            }
            Err(_) => number += 1,
        }
    }
}
