use clap::{Parser, ValueEnum};

use m3c_rs::bdd_transformer::BddBackend;
use m3c_rs::error::WitnessError;
use m3c_rs::formula::Formula;
use m3c_rs::graph::{ContextFreeModalProcessSystem, EdgeProperty, ProcessGraph};
use m3c_rs::solver::{Solver, SolverOptions};
use m3c_rs::work_unit::PickOrder;

type F = Formula<&'static str, &'static str>;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Property {
    /// mu X.(<b><b>true || <>X)
    EventuallyBb,
    /// !mu X.(<b><b>true || <>X)
    NeverBb,
    /// EF "accept"
    ReachesAccept,
    /// AF []false
    AlwaysTerminates,
}

impl Property {
    fn formula(self) -> F {
        let eventually_bb = F::mu(
            "X",
            F::or(
                F::diamond(Some("b"), F::diamond(Some("b"), F::True)),
                F::diamond(None, F::var("X")),
            ),
        );
        match self {
            Property::EventuallyBb => eventually_bb,
            Property::NeverBb => F::not(eventually_bb),
            Property::ReachesAccept => F::ef(F::atomic("accept")),
            Property::AlwaysTerminates => F::af(F::boxed(None, F::False)),
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Property to check.
    #[arg(value_enum, default_value = "eventually-bb")]
    property: Property,

    /// BDD size (in bits, so the actual size is `2^size` nodes).
    #[clap(long, value_name = "INT", default_value = "16")]
    size: usize,

    /// Pick dirty nodes last-in first-out.
    #[clap(long)]
    lifo: bool,

    /// Print every recorded node update.
    #[clap(long)]
    trace: bool,
}

/// `a^n b^n` as a single recursive procedure:
///
/// ```text
/// s0 -a-> s1 -P-> s2 -b-> s3
///          \------b------^
/// ```
fn anbn() -> ContextFreeModalProcessSystem<ProcessGraph<&'static str, &'static str>> {
    let mut p = ProcessGraph::new();
    let s0 = p.add_node();
    let s1 = p.add_node();
    let s2 = p.add_node();
    let s3 = p.add_node_with_props(["accept"]);
    p.add_edge(s0, s1, "a", EdgeProperty::must());
    p.add_edge(s1, s2, "P", EdgeProperty::call());
    p.add_edge(s2, s3, "b", EdgeProperty::must());
    p.add_edge(s1, s3, "b", EdgeProperty::must());
    p.set_initial(s0);
    p.set_final(s3);

    let mut system = ContextFreeModalProcessSystem::new("P");
    system.add_procedure("P", p);
    system
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let system = anbn();
    let order = if args.lifo { PickOrder::Lifo } else { PickOrder::Fifo };
    let options = SolverOptions::default().with_pick_order(order);
    let solver = Solver::new(&system, BddBackend::new(args.size)?, options)?;

    let formula = args.property.formula();
    println!("Checking {}", formula);

    let (sat, history) = solver.solve_and_record_history(&formula)?;
    println!("Result: {}", if sat { "satisfied" } else { "not satisfied" });
    println!(
        "Node updates: {} ({} changed a transformer)",
        history.states().len(),
        history.num_changes()
    );

    if args.trace {
        for (i, state) in history.states().iter().enumerate() {
            println!(
                "#{} block {} {}:{:?} changed={} satisfied={:?}",
                i,
                state.block_index,
                state.procedure,
                state.node,
                state.changed(),
                state.satisfied
            );
        }
    }

    match solver.find_witness(&formula) {
        Ok(Some(tree)) => {
            println!("Witness: {}", tree.witness().join(" "));
            println!("Witness search visited {} states", tree.len());
        }
        Ok(None) => println!("No witness: the property does not hold"),
        Err(WitnessError::UnsupportedFormula(what)) => println!("No witness search for '{}'", what),
        Err(e) => return Err(e.into()),
    }

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
