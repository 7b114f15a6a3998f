//! Input formulas: the modal mu-calculus plus the usual CTL operators.
//!
//! `L` is the type of action labels, `AP` the type of atomic propositions. A modality whose
//! action is `None` ranges over every action (`[]φ`, `<>φ`).
//!
//! CTL operators are sugar: [`Formula::to_mu_calculus`][crate::ctl] rewrites them into
//! fixpoints and [`Formula::to_nnf`][crate::nnf] pushes negations down to the leaves.
//! The dependency graph builder applies both, so any formula built here can be solved.
//!
//! ```
//! use m3c_rs::formula::Formula;
//!
//! // mu X.(<b>true || <>X)
//! let f: Formula<&str, &str> = Formula::mu(
//!     "X",
//!     Formula::or(Formula::diamond(Some("b"), Formula::True), Formula::diamond(None, Formula::var("X"))),
//! );
//! assert_eq!(f.to_string(), "mu X.(<b>true || <>X)");
//! ```

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Formula<L, AP> {
    True,
    False,
    Atomic(AP),
    Not(Box<Formula<L, AP>>),
    And(Box<Formula<L, AP>>, Box<Formula<L, AP>>),
    Or(Box<Formula<L, AP>>, Box<Formula<L, AP>>),
    /// `[a]φ`: every `a`-successor satisfies `φ`.
    Box(Option<L>, Box<Formula<L, AP>>),
    /// `<a>φ`: some must `a`-successor satisfies `φ`.
    Diamond(Option<L>, Box<Formula<L, AP>>),
    /// Least fixpoint `mu X.φ`.
    Mu(String, Box<Formula<L, AP>>),
    /// Greatest fixpoint `nu X.φ`.
    Nu(String, Box<Formula<L, AP>>),
    Var(String),
    AF(Box<Formula<L, AP>>),
    AG(Box<Formula<L, AP>>),
    /// `A[φ U ψ]`
    AU(Box<Formula<L, AP>>, Box<Formula<L, AP>>),
    /// `A[φ W ψ]`
    AW(Box<Formula<L, AP>>, Box<Formula<L, AP>>),
    EF(Box<Formula<L, AP>>),
    EG(Box<Formula<L, AP>>),
    /// `E[φ U ψ]`
    EU(Box<Formula<L, AP>>, Box<Formula<L, AP>>),
    /// `E[φ W ψ]`
    EW(Box<Formula<L, AP>>, Box<Formula<L, AP>>),
}

impl<L, AP> Formula<L, AP> {
    pub fn atomic(ap: AP) -> Self {
        Formula::Atomic(ap)
    }
    pub fn not(f: Self) -> Self {
        Formula::Not(Box::new(f))
    }
    pub fn and(f: Self, g: Self) -> Self {
        Formula::And(Box::new(f), Box::new(g))
    }
    pub fn or(f: Self, g: Self) -> Self {
        Formula::Or(Box::new(f), Box::new(g))
    }
    pub fn boxed(action: Option<L>, f: Self) -> Self {
        Formula::Box(action, Box::new(f))
    }
    pub fn diamond(action: Option<L>, f: Self) -> Self {
        Formula::Diamond(action, Box::new(f))
    }
    pub fn mu(name: impl Into<String>, f: Self) -> Self {
        Formula::Mu(name.into(), Box::new(f))
    }
    pub fn nu(name: impl Into<String>, f: Self) -> Self {
        Formula::Nu(name.into(), Box::new(f))
    }
    pub fn var(name: impl Into<String>) -> Self {
        Formula::Var(name.into())
    }
    pub fn af(f: Self) -> Self {
        Formula::AF(Box::new(f))
    }
    pub fn ag(f: Self) -> Self {
        Formula::AG(Box::new(f))
    }
    pub fn au(f: Self, g: Self) -> Self {
        Formula::AU(Box::new(f), Box::new(g))
    }
    pub fn aw(f: Self, g: Self) -> Self {
        Formula::AW(Box::new(f), Box::new(g))
    }
    pub fn ef(f: Self) -> Self {
        Formula::EF(Box::new(f))
    }
    pub fn eg(f: Self) -> Self {
        Formula::EG(Box::new(f))
    }
    pub fn eu(f: Self, g: Self) -> Self {
        Formula::EU(Box::new(f), Box::new(g))
    }
    pub fn ew(f: Self, g: Self) -> Self {
        Formula::EW(Box::new(f), Box::new(g))
    }

    /// Immediate subformulas, left to right.
    pub fn children(&self) -> Vec<&Formula<L, AP>> {
        match self {
            Formula::True | Formula::False | Formula::Atomic(_) | Formula::Var(_) => vec![],
            Formula::Not(f)
            | Formula::Box(_, f)
            | Formula::Diamond(_, f)
            | Formula::Mu(_, f)
            | Formula::Nu(_, f)
            | Formula::AF(f)
            | Formula::AG(f)
            | Formula::EF(f)
            | Formula::EG(f) => vec![&**f],
            Formula::And(f, g)
            | Formula::Or(f, g)
            | Formula::AU(f, g)
            | Formula::AW(f, g)
            | Formula::EU(f, g)
            | Formula::EW(f, g) => vec![&**f, &**g],
        }
    }

    /// Whether the formula uses any CTL operator.
    pub fn is_ctl(&self) -> bool {
        matches!(
            self,
            Formula::AF(_)
                | Formula::AG(_)
                | Formula::AU(..)
                | Formula::AW(..)
                | Formula::EF(_)
                | Formula::EG(_)
                | Formula::EU(..)
                | Formula::EW(..)
        ) || self.children().into_iter().any(Formula::is_ctl)
    }

    /// Names of all fixpoint variables, bound or referenced.
    pub fn variable_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut stack = vec![self];
        while let Some(f) = stack.pop() {
            match f {
                Formula::Mu(x, _) | Formula::Nu(x, _) | Formula::Var(x) => names.push(x.as_str()),
                _ => {}
            }
            stack.extend(f.children());
        }
        names
    }
}

fn fmt_action<L: Display>(action: &Option<L>) -> String {
    match action {
        Some(a) => a.to_string(),
        None => String::new(),
    }
}

impl<L: Display, AP: Display> Display for Formula<L, AP> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Formula::True => write!(f, "true"),
            Formula::False => write!(f, "false"),
            Formula::Atomic(p) => write!(f, "\"{}\"", p),
            Formula::Not(g) => write!(f, "!{}", g),
            Formula::And(g, h) => write!(f, "({} && {})", g, h),
            Formula::Or(g, h) => write!(f, "({} || {})", g, h),
            Formula::Box(a, g) => write!(f, "[{}]{}", fmt_action(a), g),
            Formula::Diamond(a, g) => write!(f, "<{}>{}", fmt_action(a), g),
            Formula::Mu(x, g) => write!(f, "mu {}.{}", x, g),
            Formula::Nu(x, g) => write!(f, "nu {}.{}", x, g),
            Formula::Var(x) => write!(f, "{}", x),
            Formula::AF(g) => write!(f, "AF {}", g),
            Formula::AG(g) => write!(f, "AG {}", g),
            Formula::AU(g, h) => write!(f, "A[{} U {}]", g, h),
            Formula::AW(g, h) => write!(f, "A[{} W {}]", g, h),
            Formula::EF(g) => write!(f, "EF {}", g),
            Formula::EG(g) => write!(f, "EG {}", g),
            Formula::EU(g, h) => write!(f, "E[{} U {}]", g, h),
            Formula::EW(g, h) => write!(f, "E[{} W {}]", g, h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type F = Formula<&'static str, &'static str>;

    #[test]
    fn test_display() {
        let f: F = Formula::nu(
            "X",
            Formula::and(Formula::not(Formula::atomic("p")), Formula::boxed(Some("a"), Formula::var("X"))),
        );
        assert_eq!(f.to_string(), "nu X.(!\"p\" && [a]X)");

        let g: F = Formula::eu(Formula::True, Formula::atomic("done"));
        assert_eq!(g.to_string(), "E[true U \"done\"]");
        assert_eq!(Formula::<&str, &str>::diamond(None, Formula::False).to_string(), "<>false");
    }

    #[test]
    fn test_is_ctl() {
        let f: F = Formula::mu("X", Formula::or(Formula::atomic("p"), Formula::diamond(None, Formula::var("X"))));
        assert!(!f.is_ctl());
        let g: F = Formula::and(Formula::True, Formula::ag(Formula::atomic("p")));
        assert!(g.is_ctl());
    }

    #[test]
    fn test_variable_names() {
        let f: F = Formula::mu("X", Formula::nu("Y", Formula::or(Formula::var("X"), Formula::var("Y"))));
        let mut names = f.variable_names();
        names.sort();
        assert_eq!(names, vec!["X", "X", "Y", "Y"]);
    }
}
