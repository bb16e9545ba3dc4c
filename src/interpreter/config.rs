//! Capacities of a processor's fixed resources.
//!
//! Every component receives its size from a [`Config`] at construction; there
//! is no global configuration state.

use crate::interpreter::errors::{VmError, VmResult};

pub const DATA_STACK_ENV: &str = "STACK_VM_DATA_STACK";
pub const RETURN_STACK_ENV: &str = "STACK_VM_RETURN_STACK";
pub const PROGRAM_SIZE_ENV: &str = "STACK_VM_PROGRAM_SIZE";
pub const ARENA_SIZE_ENV: &str = "STACK_VM_ARENA_SIZE";

/// Resource limits for one processor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Maximum number of words on the data stack.
    pub data_stack_capacity: usize,
    /// Maximum call nesting depth.
    pub return_stack_capacity: usize,
    /// Maximum number of instructions in a program.
    pub program_capacity: usize,
    /// Size of the memory arena in bytes.
    pub arena_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_stack_capacity: 64,
            return_stack_capacity: 32,
            program_capacity: 4096,
            arena_capacity: 65536,
        }
    }
}

/// Largest accepted stack capacity, in elements.
pub const MAX_STACK_CAPACITY: usize = 1 << 20;
/// Largest accepted program, in instructions. Absolute jump targets are 24 bits wide.
pub const MAX_PROGRAM_CAPACITY: usize = 1 << 24;
/// Largest accepted arena, in bytes.
pub const MAX_ARENA_CAPACITY: usize = 1 << 28;

impl Config {
    /// Defaults overridden by any `STACK_VM_*` environment variables.
    pub fn from_env() -> VmResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable name.
    ///
    /// Values above the per-key maximum are rejected rather than clamped.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> VmResult<Self> {
        let defaults = Self::default();
        let data_stack_capacity = read(
            &lookup,
            DATA_STACK_ENV,
            defaults.data_stack_capacity,
            MAX_STACK_CAPACITY,
        )?;
        let return_stack_capacity = read(
            &lookup,
            RETURN_STACK_ENV,
            defaults.return_stack_capacity,
            MAX_STACK_CAPACITY,
        )?;
        let program_capacity = read(
            &lookup,
            PROGRAM_SIZE_ENV,
            defaults.program_capacity,
            MAX_PROGRAM_CAPACITY,
        )?;
        let arena_capacity = read(
            &lookup,
            ARENA_SIZE_ENV,
            defaults.arena_capacity,
            MAX_ARENA_CAPACITY,
        )?;
        Ok(Self {
            data_stack_capacity,
            return_stack_capacity,
            program_capacity,
            arena_capacity,
        })
    }
}

fn read(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: usize,
    max: usize,
) -> VmResult<usize> {
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    match value.trim().parse::<usize>() {
        Ok(parsed) if parsed <= max => Ok(parsed),
        _ => Err(VmError::InvalidConfig { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.data_stack_capacity, 64);
        assert_eq!(config.arena_capacity, 65536);
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup_from(&[
            (DATA_STACK_ENV, "8"),
            (ARENA_SIZE_ENV, " 1024 "),
        ]))
        .unwrap();
        assert_eq!(config.data_stack_capacity, 8);
        assert_eq!(config.arena_capacity, 1024);
        assert_eq!(config.return_stack_capacity, 32);
    }

    #[test]
    fn limits_are_inclusive() {
        let max = MAX_STACK_CAPACITY.to_string();
        let lookup = lookup_from(&[(DATA_STACK_ENV, max.as_str())]);
        let config = Config::from_lookup(lookup).unwrap();
        assert_eq!(config.data_stack_capacity, MAX_STACK_CAPACITY);
    }

    #[test]
    fn oversized_values_are_rejected() {
        for (key, value) in [
            (DATA_STACK_ENV, "1000000000000"),
            (RETURN_STACK_ENV, "1048577"),
            (PROGRAM_SIZE_ENV, "16777217"),
            (ARENA_SIZE_ENV, "18446744073709551615"),
        ] {
            let lookup = lookup_from(&[(key, value)]);
            match Config::from_lookup(lookup) {
                Err(VmError::InvalidConfig { key: k, value: v }) => {
                    assert_eq!(k, key);
                    assert_eq!(v, value);
                }
                other => panic!("{key}={value}: {other:?}"),
            }
        }
    }

    #[test]
    fn unparsable_value_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[(RETURN_STACK_ENV, "lots")])).unwrap_err();
        assert!(matches!(
            err,
            VmError::InvalidConfig { key: RETURN_STACK_ENV, ref value } if value == "lots"
        ));
    }
}
