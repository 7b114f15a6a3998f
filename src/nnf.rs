//! Negation normal form.
//!
//! Negations are pushed through the operators by duality until they sit directly on
//! atomic propositions:
//!
//! ```text
//! !true = false         !(f && g) = !f || !g      ![a]f = <a>!f
//! !false = true         !(f || g) = !f && !g      !<a>f = [a]!f
//! !!f = f               !mu X.f = nu X.!f[!X/X]   !nu X.f = mu X.!f[!X/X]
//! ```
//!
//! The substitution `[!X/X]` is carried along as a flag per bound variable, so a variable
//! reference ends up negated iff an odd number of negations applies to it. For formulas where
//! every variable occurs positively (the only ones with a meaningful fixpoint) the result has
//! no negated variables.

use crate::formula::Formula;

impl<L: Clone, AP: Clone> Formula<L, AP> {
    /// Equivalent formula in negation normal form. CTL operators are rewritten first.
    pub fn to_nnf(&self) -> Formula<L, AP> {
        let mut scope = Vec::new();
        nnf(&self.to_mu_calculus(), false, &mut scope)
    }
}

fn nnf<L: Clone, AP: Clone>(f: &Formula<L, AP>, negate: bool, scope: &mut Vec<(String, bool)>) -> Formula<L, AP> {
    use Formula as F;

    match f {
        F::True | F::False => {
            if matches!(f, F::True) != negate {
                F::True
            } else {
                F::False
            }
        }
        F::Atomic(p) => {
            if negate {
                F::not(F::Atomic(p.clone()))
            } else {
                F::Atomic(p.clone())
            }
        }
        F::Not(g) => nnf(g, !negate, scope),
        F::And(g, h) | F::Or(g, h) => {
            let (g, h) = (nnf(g, negate, scope), nnf(h, negate, scope));
            if matches!(f, F::And(..)) != negate {
                F::and(g, h)
            } else {
                F::or(g, h)
            }
        }
        F::Box(a, g) | F::Diamond(a, g) => {
            let g = nnf(g, negate, scope);
            if matches!(f, F::Box(..)) != negate {
                F::boxed(a.clone(), g)
            } else {
                F::diamond(a.clone(), g)
            }
        }
        F::Mu(x, g) | F::Nu(x, g) => {
            scope.push((x.clone(), negate));
            let g = nnf(g, negate, scope);
            scope.pop();
            if matches!(f, F::Mu(..)) != negate {
                F::mu(x.clone(), g)
            } else {
                F::nu(x.clone(), g)
            }
        }
        F::Var(x) => {
            let flipped = scope
                .iter()
                .rev()
                .find(|(name, _)| name == x)
                .map(|&(_, flipped)| flipped)
                .unwrap_or(false);
            if negate != flipped {
                F::not(F::Var(x.clone()))
            } else {
                F::Var(x.clone())
            }
        }
        // `to_nnf` rewrites CTL before getting here.
        F::AF(_) | F::AG(_) | F::AU(..) | F::AW(..) | F::EF(_) | F::EG(_) | F::EU(..) | F::EW(..) => {
            nnf(&f.to_mu_calculus(), negate, scope)
        }
    }
}
