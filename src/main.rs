//! Headless skirmish demo
//!
//! Builds a small two-level map, drops two teams of bots onto it, and
//! runs a fixed-step simulation for a while, logging what the agents
//! decide. Pass a RON tunables file as the first argument to override
//! the defaults. Run with `RUST_LOG=debug` to watch every decision.

use botbrain::prelude::*;
use log::info;
use rustc_hash::FxHashMap;

const DT: f32 = 1.0 / 60.0;
const TICKS: u32 = 3600; // one simulated minute

/// Two ground rooms joined by a corridor, an overlook ledge above the
/// east room reached by a ladder, and a crouch duct bypassing the
/// corridor.
fn build_map() -> (NavMesh, Vec3, Vec3) {
    let mut b = NavMeshBuilder::new();

    let west = b.add_cell(
        Vec2::new(0.0, 0.0),
        Vec2::new(600.0, 600.0),
        0.0,
        CellFlags::empty(),
    );
    let corridor = b.add_cell(
        Vec2::new(600.0, 250.0),
        Vec2::new(1000.0, 350.0),
        0.0,
        CellFlags::empty(),
    );
    let east = b.add_cell(
        Vec2::new(1000.0, 0.0),
        Vec2::new(1600.0, 600.0),
        0.0,
        CellFlags::empty(),
    );
    b.connect(west, corridor);
    b.connect(corridor, east);

    // overlook above the east room; climb up, jump back down
    let ledge = b.add_cell(
        Vec2::new(1400.0, 0.0),
        Vec2::new(1600.0, 200.0),
        128.0,
        CellFlags::empty(),
    );
    b.add_ladder(
        Vec3::new(1400.0, 100.0, 0.0),
        Vec3::new(1400.0, 100.0, 128.0),
        Vec2::new(-1.0, 0.0),
        east,
        Some(ledge),
        None,
        None,
        None,
    );
    b.connect_one_way(ledge, east);

    // crouch duct along the south wall
    let duct = b.add_cell(
        Vec2::new(600.0, 0.0),
        Vec2::new(1000.0, 80.0),
        0.0,
        CellFlags::CROUCH,
    );
    b.connect(west, duct);
    b.connect(duct, east);

    let west_post = Vec3::new(150.0, 300.0, 0.0);
    let east_post = Vec3::new(1450.0, 300.0, 0.0);
    (b.build(), west_post, east_post)
}

/// Sensory input for one agent, derived from raw positions. A real game
/// would trace sight lines; the demo uses plain distance.
fn senses(arena: &Arena, me: AgentId) -> CombatInput {
    const SIGHT_RANGE: f32 = 700.0;
    let mut input = CombatInput::default();
    let Some(agent) = arena.agent(me) else {
        return input;
    };
    let mut nearest: Option<(f32, Vec3)> = None;
    for other in arena.agents() {
        if other.id == me {
            continue;
        }
        let dist = other.pos.distance(agent.pos);
        if other.team == agent.team {
            if dist < SIGHT_RANGE {
                input.visible_friends += 1;
                input.friends.push(other.pos);
            }
        } else if dist < SIGHT_RANGE {
            input.visible_enemies += 1;
            if nearest.is_none_or(|(d, _)| dist < d) {
                nearest = Some((dist, other.pos));
            }
        }
    }
    input.enemy = nearest.map(|(_, pos)| EnemyInfo {
        pos,
        weapon: WeaponKind::Rifle,
        visible: true,
        time_since_seen: 0.0,
        facing_away: false,
        aiming_at_me: false,
    });
    input
}

fn main() {
    env_logger::init();

    let tun = match std::env::args().nth(1) {
        Some(path) => match Tunables::load_ron(&path) {
            Ok(t) => {
                info!("loaded tunables from {path}");
                t
            }
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
        None => Tunables::default(),
    };

    let (mesh, west_post, east_post) = build_map();
    let mut arena = Arena::new(mesh, tun, 0xB07);

    let mut roster = Vec::new();
    for i in 0..2 {
        let spread = Vec3::new(0.0, 80.0 * i as f32, 0.0);
        roster.push((
            arena.spawn(
                Team::Alpha,
                west_post + spread,
                Profile {
                    skill: 0.4 + 0.2 * i as f32,
                    aggression: 0.7,
                },
                Loadout::default(),
            ),
            east_post,
        ));
        roster.push((
            arena.spawn(
                Team::Bravo,
                east_post + spread,
                Profile {
                    skill: 0.6,
                    aggression: 0.3 + 0.3 * i as f32,
                },
                Loadout::default(),
            ),
            west_post,
        ));
    }
    info!("skirmish: {} agents, {} ticks", roster.len(), TICKS);

    let mut shots = 0_u64;
    let mut grenades = 0_u64;
    for _ in 0..TICKS {
        // idle agents push toward the opposing post
        for &(id, post) in &roster {
            let idle = arena
                .agent(id)
                .is_some_and(|a| !a.has_path() && !a.is_attacking());
            if idle {
                let _ = arena.order_move_to(id, post, RouteKind::Safest);
            }
        }

        let inputs: FxHashMap<AgentId, CombatInput> = roster
            .iter()
            .map(|&(id, _)| (id, senses(&arena, id)))
            .collect();
        arena.tick(DT, &inputs);

        for agent in arena.agents() {
            if agent.controls.fire || agent.controls.backstab {
                shots += 1;
            }
            if agent.controls.grenade == GrenadeIntent::Commit {
                grenades += 1;
            }
        }
    }

    info!(
        "done at t={:.1}s: {} fire ticks, {} grenades thrown",
        arena.now(),
        shots,
        grenades
    );
    for agent in arena.agents() {
        info!(
            "agent {} ({:?}) at ({:.0}, {:.0}, {:.0}){}",
            agent.id.0,
            agent.team,
            agent.pos.x,
            agent.pos.y,
            agent.pos.z,
            if agent.is_attacking() {
                ", engaged"
            } else {
                ""
            }
        );
    }
}
