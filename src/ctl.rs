//! Rewriting CTL operators into the modal mu-calculus.
//!
//! | CTL            | mu-calculus                                   |
//! |----------------|-----------------------------------------------|
//! | `AF p`         | `mu Z.(p \|\| (<>true && []Z))`               |
//! | `AG p`         | `nu Z.(p && []Z)`                             |
//! | `A[p U q]`     | `mu Z.(q \|\| (p && (<>true && []Z)))`        |
//! | `A[p W q]`     | `!E[!q U (!p && !q)]`                         |
//! | `EF p`         | `mu Z.(p \|\| <>Z)`                           |
//! | `EG p`         | `nu Z.(p && (<>Z \|\| []false))`              |
//! | `E[p U q]`     | `mu Z.(q \|\| (p && <>Z))`                    |
//! | `E[p W q]`     | `E[p U q] \|\| EG p`                          |
//!
//! The `<>true` conjunct keeps the universal operators from holding vacuously at
//! deadlocks, and `[]false` lets `EG` hold on finite maximal paths.
//! Every introduced variable gets a fresh name.

use std::collections::HashSet;

use crate::formula::Formula;

struct Fresh {
    taken: HashSet<String>,
    counter: usize,
}

impl Fresh {
    fn next(&mut self) -> String {
        loop {
            let name = format!("#Z{}", self.counter);
            self.counter += 1;
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }
}

impl<L: Clone, AP: Clone> Formula<L, AP> {
    /// Equivalent formula without CTL operators.
    pub fn to_mu_calculus(&self) -> Formula<L, AP> {
        let mut fresh = Fresh {
            taken: self.variable_names().into_iter().map(String::from).collect(),
            counter: 0,
        };
        rewrite(self, &mut fresh)
    }
}

fn rewrite<L: Clone, AP: Clone>(f: &Formula<L, AP>, fresh: &mut Fresh) -> Formula<L, AP> {
    use Formula as F;

    let diamond_any = |g| F::diamond(None, g);
    let box_any = |g| F::boxed(None, g);

    match f {
        F::True => F::True,
        F::False => F::False,
        F::Atomic(p) => F::Atomic(p.clone()),
        F::Var(x) => F::Var(x.clone()),
        F::Not(g) => F::not(rewrite(g, fresh)),
        F::And(g, h) => F::and(rewrite(g, fresh), rewrite(h, fresh)),
        F::Or(g, h) => F::or(rewrite(g, fresh), rewrite(h, fresh)),
        F::Box(a, g) => F::boxed(a.clone(), rewrite(g, fresh)),
        F::Diamond(a, g) => F::diamond(a.clone(), rewrite(g, fresh)),
        F::Mu(x, g) => F::mu(x.clone(), rewrite(g, fresh)),
        F::Nu(x, g) => F::nu(x.clone(), rewrite(g, fresh)),

        F::AF(p) => {
            let p = rewrite(p, fresh);
            let z = fresh.next();
            let step = F::and(diamond_any(F::True), box_any(F::var(&z)));
            F::mu(z, F::or(p, step))
        }
        F::AG(p) => {
            let p = rewrite(p, fresh);
            let z = fresh.next();
            let step = box_any(F::var(&z));
            F::nu(z, F::and(p, step))
        }
        F::AU(p, q) => {
            let (p, q) = (rewrite(p, fresh), rewrite(q, fresh));
            let z = fresh.next();
            let step = F::and(diamond_any(F::True), box_any(F::var(&z)));
            F::mu(z, F::or(q, F::and(p, step)))
        }
        F::AW(p, q) => {
            let (p, q) = (p.as_ref().clone(), q.as_ref().clone());
            let not_q = F::not(q);
            let until = F::eu(not_q.clone(), F::and(F::not(p), not_q));
            rewrite(&F::not(until), fresh)
        }
        F::EF(p) => {
            let p = rewrite(p, fresh);
            let z = fresh.next();
            let step = diamond_any(F::var(&z));
            F::mu(z, F::or(p, step))
        }
        F::EG(p) => {
            let p = rewrite(p, fresh);
            let z = fresh.next();
            let step = F::or(diamond_any(F::var(&z)), box_any(F::False));
            F::nu(z, F::and(p, step))
        }
        F::EU(p, q) => {
            let (p, q) = (rewrite(p, fresh), rewrite(q, fresh));
            let z = fresh.next();
            let step = diamond_any(F::var(&z));
            F::mu(z, F::or(q, F::and(p, step)))
        }
        F::EW(p, q) => {
            let weak = F::or(F::eu(p.as_ref().clone(), q.as_ref().clone()), F::eg(p.as_ref().clone()));
            rewrite(&weak, fresh)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type F = Formula<&'static str, &'static str>;

    #[test]
    fn test_ef() {
        let f: F = Formula::ef(Formula::atomic("p"));
        assert_eq!(f.to_mu_calculus().to_string(), "mu #Z0.(\"p\" || <>#Z0)");
    }

    #[test]
    fn test_ag() {
        let f: F = Formula::ag(Formula::atomic("p"));
        assert_eq!(f.to_mu_calculus().to_string(), "nu #Z0.(\"p\" && []#Z0)");
    }

    #[test]
    fn test_af_and_au() {
        let f: F = Formula::af(Formula::atomic("p"));
        assert_eq!(f.to_mu_calculus().to_string(), "mu #Z0.(\"p\" || (<>true && []#Z0))");

        let g: F = Formula::au(Formula::atomic("p"), Formula::atomic("q"));
        assert_eq!(
            g.to_mu_calculus().to_string(),
            "mu #Z0.(\"q\" || (\"p\" && (<>true && []#Z0)))"
        );
    }

    #[test]
    fn test_eg_and_eu() {
        let f: F = Formula::eg(Formula::atomic("p"));
        assert_eq!(f.to_mu_calculus().to_string(), "nu #Z0.(\"p\" && (<>#Z0 || []false))");

        let g: F = Formula::eu(Formula::atomic("p"), Formula::atomic("q"));
        assert_eq!(g.to_mu_calculus().to_string(), "mu #Z0.(\"q\" || (\"p\" && <>#Z0))");
    }

    #[test]
    fn test_weak_until() {
        let f: F = Formula::ew(Formula::atomic("p"), Formula::atomic("q"));
        assert_eq!(
            f.to_mu_calculus().to_string(),
            "(mu #Z0.(\"q\" || (\"p\" && <>#Z0)) || nu #Z1.(\"p\" && (<>#Z1 || []false)))"
        );

        let g: F = Formula::aw(Formula::atomic("p"), Formula::atomic("q"));
        assert_eq!(
            g.to_mu_calculus().to_string(),
            "!mu #Z0.((!\"p\" && !\"q\") || (!\"q\" && <>#Z0))"
        );
    }

    #[test]
    fn test_nested_operators_get_distinct_variables() {
        let f: F = Formula::ag(Formula::ef(Formula::atomic("p")));
        assert_eq!(
            f.to_mu_calculus().to_string(),
            "nu #Z1.(mu #Z0.(\"p\" || <>#Z0) && []#Z1)"
        );
    }

    #[test]
    fn test_fresh_names_avoid_user_variables() {
        let f: F = Formula::mu("#Z0", Formula::or(Formula::ef(Formula::True), Formula::diamond(None, Formula::var("#Z0"))));
        assert_eq!(
            f.to_mu_calculus().to_string(),
            "mu #Z0.(mu #Z1.(true || <>#Z1) || <>#Z0)"
        );
    }

    #[test]
    fn test_plain_mu_calculus_is_unchanged() {
        let f: F = Formula::nu("X", Formula::and(Formula::atomic("p"), Formula::boxed(Some("a"), Formula::var("X"))));
        assert_eq!(f.to_mu_calculus(), f);
    }
}
