//! Variable interpolation for sequence definitions
//!
//! Replaces `${var}` references in configured strings, looking variables
//! up in the sequence's `vars` map first and the process environment
//! second. Unknown variables are left in place; the executed command is
//! the place where that surfaces.

use crate::error::{InterpolationError, InterpolationResult};
use regex::Regex;
use std::collections::HashMap;
use std::env;

/// Interpolate `${var}` references in a string.
///
/// Nested references are expanded until the string stops changing.
pub fn interpolate(s: &str, vars: &HashMap<String, String>) -> InterpolationResult<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

    let mut result = s.to_string();
    let mut rounds = 0;

    loop {
        let mut changed = false;

        result = re
            .replace_all(&result, |caps: &regex::Captures| {
                let var_name = &caps[1];

                if let Some(value) = vars.get(var_name) {
                    changed = true;
                    return value.clone();
                }

                if let Ok(value) = env::var(var_name) {
                    changed = true;
                    return value;
                }

                // unknown variable, leave the reference as-is
                format!("${{{}}}", var_name)
            })
            .to_string();

        if !changed {
            break;
        }

        rounds += 1;
        if rounds > 100 {
            return Err(InterpolationError::RecursiveInterpolation);
        }
    }

    Ok(result)
}
