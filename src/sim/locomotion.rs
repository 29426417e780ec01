//! Reference locomotion for demos and integration tests
//!
//! Consumes the per-tick [`Controls`](crate::agent::Controls) the
//! decision engine emits and integrates a simple kinematic body against
//! the mesh: stance speeds, step-ups, gravity, jumps, and ladder
//! latching. An embedding game replaces this with its own movement code;
//! nothing in the engine depends on it.

use glam::{Vec2, Vec3, Vec3Swizzles};

use crate::agent::{Agent, normalize_yaw, yaw_delta};
use crate::config::Tunables;
use crate::nav::{Ladder, NavMesh};

const GRAVITY: f32 = 800.0;
/// View turn rate in degrees per second
const TURN_RATE: f32 = 720.0;

/// Integrate one tick of kinematic movement from the agent's controls
pub fn apply_simple_locomotion(agent: &mut Agent, mesh: &NavMesh, tun: &Tunables, dt: f32) {
    if dt <= 0.0 {
        return;
    }
    let start = agent.pos;

    if let Some(target) = agent.controls.face_yaw {
        let max_turn = TURN_RATE * dt;
        let delta = yaw_delta(target, agent.eye_yaw).clamp(-max_turn, max_turn);
        agent.eye_yaw = normalize_yaw(agent.eye_yaw + delta);
    }

    let target = if let Some(p) = agent.controls.move_away_from {
        Some(agent.pos + (agent.pos - p))
    } else {
        agent.controls.move_to
    };

    if agent.on_ladder {
        climb(agent, mesh, tun, dt, target);
    } else {
        walk(agent, mesh, tun, dt, target);
    }

    let vz = agent.vel.z;
    agent.vel = (agent.pos - start) / dt;
    if agent.airborne {
        agent.vel.z = vz;
    }
}

fn stance_speed(agent: &Agent, tun: &Tunables) -> f32 {
    if agent.is_crouching() {
        tun.body.crouch_speed
    } else if agent.is_running() {
        tun.body.run_speed
    } else {
        tun.body.walk_speed
    }
}

fn walk(agent: &mut Agent, mesh: &NavMesh, tun: &Tunables, dt: f32, target: Option<Vec3>) {
    if let Some(t) = target {
        let offset = (t - agent.pos).xy();
        let dist = offset.length();
        if dist > 1e-3 {
            let mut dir = offset / dist;
            if agent.controls.wiggle {
                // skew sideways to shake loose from a snag
                let side = if ((agent.pos.x + agent.pos.y) as i64) & 1 == 0 {
                    1.0
                } else {
                    -1.0
                };
                dir = (dir + Vec2::new(-dir.y, dir.x) * 0.5 * side).normalize();
            }
            let step = (stance_speed(agent, tun) * dt).min(dist);
            agent.pos += (dir * step).extend(0.0);
        }

        // pressing onto a ladder axis latches on
        for ladder in mesh.ladders() {
            if can_latch(agent, ladder, t, tun) {
                agent.on_ladder = true;
                agent.airborne = false;
                agent.vel.z = 0.0;
                agent.pos.x = ladder.bottom.x;
                agent.pos.y = ladder.bottom.y;
                return;
            }
        }
    }

    // jumping
    if (agent.controls.jump || agent.controls.must_jump) && !agent.airborne {
        agent.vel.z = (2.0 * GRAVITY * tun.body.jump_height).sqrt();
        agent.airborne = true;
    }

    // vertical support
    let probe = agent.pos + Vec3::Z * tun.body.half_height;
    let ground = mesh.ground_height(probe);
    if agent.airborne {
        agent.vel.z -= GRAVITY * dt;
        let new_z = agent.pos.z + agent.vel.z * dt;
        match ground {
            Some(h) if new_z <= h => {
                agent.pos.z = h;
                agent.vel.z = 0.0;
                agent.airborne = false;
            }
            _ => agent.pos.z = new_z,
        }
    } else {
        match ground {
            Some(h) if agent.pos.z - h > tun.body.step_height => {
                // walked off a ledge
                agent.vel.z = 0.0;
                agent.airborne = true;
            }
            Some(h) => agent.pos.z = h,
            None => {
                agent.vel.z = 0.0;
                agent.airborne = true;
            }
        }
    }
}

fn can_latch(agent: &Agent, ladder: &Ladder, target: Vec3, tun: &Tunables) -> bool {
    let axis = ladder.bottom.xy();
    agent.pos.xy().distance(axis) <= tun.ladder.mount_tolerance
        && target.xy().distance(axis) <= tun.ladder.mount_tolerance
        && agent.pos.z >= ladder.bottom.z - tun.body.jump_crouch_height
        && agent.pos.z <= ladder.top.z + tun.body.step_height
}

fn climb(agent: &mut Agent, mesh: &NavMesh, tun: &Tunables, dt: f32, target: Option<Vec3>) {
    let Some(t) = target else {
        return;
    };
    let Some(ladder) = mesh
        .ladders()
        .min_by(|a, b| {
            let da = agent.pos.xy().distance_squared(a.bottom.xy());
            let db = agent.pos.xy().distance_squared(b.bottom.xy());
            da.total_cmp(&db)
        })
    else {
        agent.on_ladder = false;
        return;
    };
    let axis = ladder.bottom.xy();

    // steering well off the axis (or jumping) releases the ladder
    let released = agent.controls.jump
        || agent.controls.must_jump
        || t.xy().distance(axis) > tun.ladder.close_to_goal;
    if released {
        agent.on_ladder = false;
        agent.airborne = true;
        agent.vel.z = 0.0;
        let dir = (t - agent.pos).xy().normalize_or_zero();
        agent.pos += (dir * tun.body.run_speed * dt).extend(0.0);
        return;
    }

    let step = tun.body.climb_speed * dt;
    agent.pos.z += (t.z - agent.pos.z).clamp(-step, step);
    agent.pos.x = axis.x;
    agent.pos.y = axis.y;
    agent.vel.z = 0.0;
}
