//! Transform functors
//!
//! Functors are the pure numeric functions a transform node applies to its
//! input ports. They carry fixed parameters captured at construction and never
//! hold state between cycles; state belongs to the node.
//!
//! # Built-in Functors
//!
//! - `doubler` - `y = 2x`
//! - `square_root_scale` - `y = (2/3)·√x`
//! - `difference` - `y = b − a`
//! - `affine_scale` - `y = α·(x − β)`
//! - `fusion` - `y = 3·(v1 − v3)/v2 − 3`, or `1` when `v2 == 0`
//! - `clamp` - clamp to `[-1, 1]`, optionally negated
//!
//! # Example
//!
//! ```yaml
//! functor:
//!   kind: affine_scale
//!   alpha: 2.7
//!   beta: 1.0
//! ```

use serde::{Deserialize, Serialize};

use crate::Value;

/// A function of one value
pub trait Functor1 {
    /// Compute the output
    fn calc(&self, v1: Value) -> Value;
}

/// A function of two values
pub trait Functor2 {
    /// Compute the output
    fn calc(&self, v1: Value, v2: Value) -> Value;
}

/// A function of three values
pub trait Functor3 {
    /// Compute the output
    fn calc(&self, v1: Value, v2: Value, v3: Value) -> Value;
}

impl<F: Fn(Value) -> Value> Functor1 for F {
    fn calc(&self, v1: Value) -> Value {
        self(v1)
    }
}

impl<F: Fn(Value, Value) -> Value> Functor2 for F {
    fn calc(&self, v1: Value, v2: Value) -> Value {
        self(v1, v2)
    }
}

impl<F: Fn(Value, Value, Value) -> Value> Functor3 for F {
    fn calc(&self, v1: Value, v2: Value, v3: Value) -> Value {
        self(v1, v2, v3)
    }
}

/// An arity-tagged functor bound to a transform node
pub enum Functor {
    /// One input
    Unary(Box<dyn Functor1>),
    /// Two inputs
    Binary(Box<dyn Functor2>),
    /// Three inputs
    Ternary(Box<dyn Functor3>),
}

impl Functor {
    /// Wrap a one-input functor
    pub fn unary(f: impl Functor1 + 'static) -> Self {
        Self::Unary(Box::new(f))
    }

    /// Wrap a two-input functor
    pub fn binary(f: impl Functor2 + 'static) -> Self {
        Self::Binary(Box::new(f))
    }

    /// Wrap a three-input functor
    pub fn ternary(f: impl Functor3 + 'static) -> Self {
        Self::Ternary(Box::new(f))
    }

    /// Number of inputs the functor takes
    pub fn arity(&self) -> usize {
        match self {
            Self::Unary(_) => 1,
            Self::Binary(_) => 2,
            Self::Ternary(_) => 3,
        }
    }

    /// Apply the functor to `inputs`.
    ///
    /// `inputs` must hold exactly `arity()` values; the transform node
    /// guarantees this by sizing its ports from the functor.
    pub fn apply(&self, inputs: &[Value]) -> Value {
        match (self, inputs) {
            (Self::Unary(f), [v1]) => f.calc(*v1),
            (Self::Binary(f), [v1, v2]) => f.calc(*v1, *v2),
            (Self::Ternary(f), [v1, v2, v3]) => f.calc(*v1, *v2, *v3),
            _ => Value::NAN,
        }
    }
}

impl std::fmt::Debug for Functor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Functor(arity {})", self.arity())
    }
}

/// Doubles its input
#[derive(Debug, Clone, Copy, Default)]
pub struct Doubler;

impl Functor1 for Doubler {
    fn calc(&self, v1: Value) -> Value {
        v1 * 2.0
    }
}

/// Two thirds of the square root of its input
#[derive(Debug, Clone, Copy, Default)]
pub struct SquareRootScale;

impl Functor1 for SquareRootScale {
    fn calc(&self, v1: Value) -> Value {
        2.0 / 3.0 * v1.sqrt()
    }
}

/// Second input minus the first
#[derive(Debug, Clone, Copy, Default)]
pub struct Difference;

impl Functor2 for Difference {
    fn calc(&self, v1: Value, v2: Value) -> Value {
        v2 - v1
    }
}

/// `alpha * (x - beta)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineScale {
    alpha: Value,
    beta: Value,
}

impl AffineScale {
    /// Create a scale with gain `alpha` and offset `beta`
    pub fn new(alpha: Value, beta: Value) -> Self {
        Self { alpha, beta }
    }
}

impl Functor1 for AffineScale {
    fn calc(&self, v1: Value) -> Value {
        self.alpha * (v1 - self.beta)
    }
}

/// Combines three scaled sensor readings.
///
/// A zero middle reading has no defined ratio and yields `1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fusion;

impl Functor3 for Fusion {
    fn calc(&self, v1: Value, v2: Value, v3: Value) -> Value {
        if v2 == 0.0 {
            return 1.0;
        }
        3.0 * (v1 - v3) / v2 - 3.0
    }
}

/// Limits its input to `[-1, 1]`, negating the result when `invert` is set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clamp {
    invert: bool,
}

impl Clamp {
    /// Create a clamp
    pub fn new(invert: bool) -> Self {
        Self { invert }
    }
}

impl Functor1 for Clamp {
    fn calc(&self, v1: Value) -> Value {
        let clamped = v1.clamp(-1.0, 1.0);
        if self.invert { -clamped } else { clamped }
    }
}

/// Functor configuration from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FunctorConfig {
    /// `y = 2x`
    Doubler,

    /// `y = (2/3)·√x`
    SquareRootScale,

    /// `y = b − a`
    Difference,

    /// `y = α·(x − β)`
    AffineScale {
        /// Gain
        alpha: Value,
        /// Offset subtracted before scaling
        beta: Value,
    },

    /// Three-input sensor fusion
    Fusion,

    /// Clamp to `[-1, 1]`
    Clamp {
        /// Negate the clamped value
        #[serde(default)]
        invert: bool,
    },
}

impl FunctorConfig {
    /// Short name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Doubler => "doubler",
            Self::SquareRootScale => "square_root_scale",
            Self::Difference => "difference",
            Self::AffineScale { .. } => "affine_scale",
            Self::Fusion => "fusion",
            Self::Clamp { .. } => "clamp",
        }
    }

    /// Number of inputs the functor takes
    pub fn arity(&self) -> usize {
        match self {
            Self::Difference => 2,
            Self::Fusion => 3,
            _ => 1,
        }
    }

    /// Build the configured functor
    pub fn build(&self) -> Functor {
        match *self {
            Self::Doubler => Functor::unary(Doubler),
            Self::SquareRootScale => Functor::unary(SquareRootScale),
            Self::Difference => Functor::binary(Difference),
            Self::AffineScale { alpha, beta } => Functor::unary(AffineScale::new(alpha, beta)),
            Self::Fusion => Functor::ternary(Fusion),
            Self::Clamp { invert } => Functor::unary(Clamp::new(invert)),
        }
    }
}
