//! Hierarchical Traffic Light
//!
//! This example demonstrates a traffic light whose colour states share a
//! parent that handles faults for all of them.
//!
//! Key concepts:
//! - Ancestor fallback (`Fault` is handled once, by `Operating`)
//! - Minimal exit/enter walks between nested states
//! - Deferring an event until the machine reaches a suitable state
//!
//! Run with: cargo run --example traffic_light

use statetree::{Context, Machine, Result, State};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Light {
    Operating,
    Red,
    Green,
    Yellow,
    Flashing,
}

#[derive(Debug)]
enum Signal {
    Tick,
    Walk,
    Fault,
    Repaired,
}

struct Operating;

impl State<Light, Signal> for Operating {
    fn name(&self) -> &str {
        "Operating"
    }

    fn enter(&mut self, _ctx: &mut Context<'_, Light, Signal>, _reason: Option<&Signal>) -> Result<()> {
        println!("  [Operating] controller online");
        Ok(())
    }

    fn exit(&mut self, _ctx: &mut Context<'_, Light, Signal>, _reason: Option<&Signal>) -> Result<()> {
        println!("  [Operating] controller offline");
        Ok(())
    }

    fn handle_event(&mut self, ctx: &mut Context<'_, Light, Signal>, event: &Signal) -> Result<bool> {
        match event {
            Signal::Fault => ctx.transition_to(Light::Flashing).map(|()| true),
            _ => Ok(false),
        }
    }
}

/// One colour of the cycle.
struct Colour {
    label: &'static str,
    next: Light,
}

impl State<Light, Signal> for Colour {
    fn name(&self) -> &str {
        self.label
    }

    fn enter(&mut self, _ctx: &mut Context<'_, Light, Signal>, _reason: Option<&Signal>) -> Result<()> {
        println!("  [{}] on", self.label);
        Ok(())
    }

    fn handle_event(&mut self, ctx: &mut Context<'_, Light, Signal>, event: &Signal) -> Result<bool> {
        match event {
            Signal::Tick => ctx.transition_to(self.next).map(|()| true),
            Signal::Walk if ctx.current_state() == Light::Red => {
                println!("  [{}] pedestrians may cross", self.label);
                Ok(true)
            }
            Signal::Walk => {
                println!("  [{}] walk request held until red", self.label);
                ctx.defer_event(Signal::Walk);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

struct Flashing;

impl State<Light, Signal> for Flashing {
    fn name(&self) -> &str {
        "Flashing"
    }

    fn handle_event(&mut self, ctx: &mut Context<'_, Light, Signal>, event: &Signal) -> Result<bool> {
        match event {
            Signal::Repaired => ctx.transition_to(Light::Red).map(|()| true),
            // Everything else is ignored while flashing.
            _ => Ok(true),
        }
    }
}

fn main() -> Result<()> {
    println!("=== Hierarchical Traffic Light ===\n");

    let mut machine: Machine<Light, Signal> = Machine::new("crossing");
    machine.start(None, |tree| {
        tree.add_state(Light::Operating, Operating)
            .add(
                Light::Red,
                Colour {
                    label: "Red",
                    next: Light::Green,
                },
                Some(Light::Operating),
                true,
            )
            .add_child(
                Light::Green,
                Colour {
                    label: "Green",
                    next: Light::Yellow,
                },
                Light::Operating,
            )
            .add_child(
                Light::Yellow,
                Colour {
                    label: "Yellow",
                    next: Light::Red,
                },
                Light::Operating,
            )
            .add_state(Light::Flashing, Flashing);
    })?;

    for signal in [
        Signal::Tick,
        Signal::Walk,
        Signal::Tick,
        Signal::Tick,
        Signal::Fault,
        Signal::Tick,
        Signal::Repaired,
    ] {
        println!("-> {signal:?}");
        machine.send_event(signal)?;
        println!("   now in {:?}\n", machine.active_path());
    }

    println!("Visited: {}", machine.history().path().join(" -> "));
    println!("\n=== Example Complete ===");
    Ok(())
}
