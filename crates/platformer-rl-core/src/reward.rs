//! Reward record pushed once per decision tick

use serde::{Deserialize, Serialize};

/// Scalar reward signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct Reward(pub f64);

impl Reward {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Reward {
    fn from(value: f64) -> Reward {
        Reward(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_bare_float() {
        let json = serde_json::to_string(&Reward(-2.5)).unwrap();
        assert_eq!(json, "-2.5");
        let back: Reward = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value(), -2.5);
    }
}
