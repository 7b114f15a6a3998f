//! Systems and formulas shared by the integration tests.

#![allow(dead_code)]

use m3c_rs::formula::Formula;
use m3c_rs::graph::{ContextFreeModalProcessSystem, EdgeProperty, ProcessGraph};

pub type Graph = ProcessGraph<&'static str, &'static str>;
pub type System = ContextFreeModalProcessSystem<Graph>;
pub type F = Formula<&'static str, &'static str>;

/// `main: s0 -enter-> s1 -helper-> s2`, `helper: s0 -a-> s1`.
pub fn helper_system() -> System {
    let mut main = Graph::new();
    let m0 = main.add_node();
    let m1 = main.add_node();
    let m2 = main.add_node();
    main.add_edge(m0, m1, "enter", EdgeProperty::must());
    main.add_edge(m1, m2, "helper", EdgeProperty::call());
    main.set_initial(m0);
    main.set_final(m2);

    let mut helper = Graph::new();
    let h0 = helper.add_node();
    let h1 = helper.add_node();
    helper.add_edge(h0, h1, "a", EdgeProperty::must());
    helper.set_initial(h0);
    helper.set_final(h1);

    let mut system = System::new("main");
    system.add_procedure("main", main);
    system.add_procedure("helper", helper);
    system
}

/// The language `a^n b^n` (n >= 1) as one recursive procedure `P`:
///
/// ```text
/// s0 -a-> s1 -P-> s2 -b-> s3
///          \------b------^
/// ```
///
/// The final node `s3` carries `final_props`.
pub fn anbn(final_props: &[&'static str]) -> System {
    let mut p = Graph::new();
    let s0 = p.add_node();
    let s1 = p.add_node();
    let s2 = p.add_node();
    let s3 = p.add_node_with_props(final_props.iter().copied());
    p.add_edge(s0, s1, "a", EdgeProperty::must());
    p.add_edge(s1, s2, "P", EdgeProperty::call());
    p.add_edge(s2, s3, "b", EdgeProperty::must());
    p.add_edge(s1, s3, "b", EdgeProperty::must());
    p.set_initial(s0);
    p.set_final(s3);

    let mut system = System::new("P");
    system.add_procedure("P", p);
    system
}

/// `mu X.(<action>true || <>X)`
pub fn eventually(action: &'static str) -> F {
    F::mu("X", F::or(F::diamond(Some(action), F::True), F::diamond(None, F::var("X"))))
}

/// `mu X.(<b><b>true || <>X)`
pub fn eventually_bb() -> F {
    F::mu(
        "X",
        F::or(
            F::diamond(Some("b"), F::diamond(Some("b"), F::True)),
            F::diamond(None, F::var("X")),
        ),
    )
}
