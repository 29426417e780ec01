//! Ladder traversal
//!
//! A ladder node on the path hands control to this sub-state machine:
//! approach the mount point, square up to the ladder, latch on, climb,
//! and dismount into the destination cell. Every state can abort; an
//! abort jumps off, tears the path down, and lets the owner replan.

use glam::{Vec2, Vec3, Vec3Swizzles};
use log::{debug, warn};

use crate::agent::{Agent, vec_to_yaw, yaws_close};
use crate::nav::{CellFlags, CellId, Ladder, LadderId};
use crate::sim::TickCtx;

use super::How;

/// Which way to step off at the top of an ascent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismountDir {
    Forward,
    Left,
    Right,
}

/// Phases of a ladder traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderState {
    /// Moving to the mount point at the bottom
    ApproachAscent,
    /// Moving to the mount point at the top
    ApproachDescent,
    /// Turning to face the ladder before climbing up
    FaceAscent,
    /// Turning toward the ladder before backing down it
    FaceDescent,
    /// Pressing onto the ladder from the bottom
    MountAscent,
    /// Stepping off the ledge onto the ladder
    MountDescent,
    /// Climbing up
    Ascend,
    /// Climbing down
    Descend,
    /// Pushing over the lip at the top
    DismountTop,
    /// Walking into the destination cell
    MoveToDestination,
}

/// State of an in-progress ladder traversal
#[derive(Debug, Clone)]
pub struct LadderMotion {
    /// The ladder being traversed
    pub ladder: LadderId,
    state: LadderState,
    ascending: bool,
    dismount: DismountDir,
    /// Feet height at which the climb ends
    endpoint_z: f32,
    /// When the traversal began (for the timeout watchdog)
    started: f32,
    /// When the top dismount began
    dismount_at: f32,
    /// Current movement target
    goal: Vec3,
    /// Cell the traversal delivers the agent into
    dest_cell: CellId,
}

impl LadderMotion {
    /// Current phase
    #[must_use]
    pub fn state(&self) -> LadderState {
        self.state
    }

    #[must_use]
    pub fn is_ascending(&self) -> bool {
        self.ascending
    }
}

/// What a state handler wants done after its tick
enum Step {
    Stay,
    Goto(LadderState),
    /// Traversal finished; advance past the ladder node
    Done,
    /// Traversal failed; tear the path down and replan
    Abort,
}

impl Agent {
    /// Arm a ladder traversal for the ladder node at the path cursor
    pub(crate) fn begin_ladder_motion(&mut self, ctx: &mut TickCtx) {
        let cursor = self.path.cursor();
        let node = *self.path.node(cursor);
        let Some(lid) = node.ladder else {
            return;
        };
        let ascending = node.how == How::LadderUp;
        let ladder = ctx.mesh.ladder(lid);

        let motion = LadderMotion {
            ladder: lid,
            state: if ascending {
                LadderState::ApproachAscent
            } else {
                LadderState::ApproachDescent
            },
            ascending,
            dismount: DismountDir::Forward,
            endpoint_z: if ascending {
                ladder.top.z
            } else {
                ladder.bottom.z
            },
            started: ctx.now,
            dismount_at: ctx.now,
            // the resolver already computed the mount/approach point
            goal: node.pos,
            dest_cell: node.cell,
        };

        debug!(
            "agent {} starting ladder {} ({})",
            self.id.0,
            lid.0,
            if ascending { "up" } else { "down" }
        );
        self.run();
        self.stand();
        self.ladder_motion = Some(motion);
    }

    /// Drive the ladder traversal for one tick. Returns false once the
    /// traversal is over, completed or aborted; an abort also clears
    /// the path.
    pub(crate) fn update_ladder(&mut self, ctx: &mut TickCtx) -> bool {
        let Some(mut m) = self.ladder_motion.take() else {
            return false;
        };
        let tun = ctx.tun;

        // watchdogs: total time, progress, and drifting off the ladder
        if ctx.now - m.started > tun.ladder.timeout || self.stuck.is_stuck() {
            warn!("agent {} timed out on ladder {}", self.id.0, m.ladder.0);
            self.controls.must_jump = true;
            self.controls.wiggle = true;
            self.stuck.reset();
            self.path.clear();
            self.run();
            return false;
        }
        let climbing = matches!(
            m.state,
            LadderState::MountAscent
                | LadderState::MountDescent
                | LadderState::Ascend
                | LadderState::Descend
        );
        let axis = ctx.mesh.ladder(m.ladder).bottom.xy();
        if climbing && self.pos.xy().distance(axis) > tun.ladder.missed_range {
            warn!("agent {} missed ladder {}", self.id.0, m.ladder.0);
            self.controls.must_jump = true;
            self.path.clear();
            self.run();
            return false;
        }

        // traversal progress must not trip the path's give-up timer
        self.cell_entered.start(ctx.now);

        let step = match m.state {
            LadderState::ApproachAscent => self.ladder_approach_ascent(ctx, &mut m),
            LadderState::ApproachDescent => self.ladder_approach_descent(ctx, &mut m),
            LadderState::FaceAscent => self.ladder_face_ascent(ctx, &mut m),
            LadderState::FaceDescent => self.ladder_face_descent(ctx, &mut m),
            LadderState::MountAscent => self.ladder_mount_ascent(ctx, &mut m),
            LadderState::MountDescent => self.ladder_mount_descent(ctx, &mut m),
            LadderState::Ascend => self.ladder_ascend(ctx, &mut m),
            LadderState::Descend => self.ladder_descend(ctx, &mut m),
            LadderState::DismountTop => self.ladder_dismount_top(ctx, &mut m),
            LadderState::MoveToDestination => self.ladder_move_to_destination(ctx, &m),
        };

        match step {
            Step::Stay => {
                self.ladder_motion = Some(m);
                true
            }
            Step::Goto(next) => {
                debug!(
                    "agent {} ladder state {:?} -> {:?}",
                    self.id.0, m.state, next
                );
                if next == LadderState::DismountTop {
                    m.dismount_at = ctx.now;
                }
                m.state = next;
                self.ladder_motion = Some(m);
                true
            }
            Step::Done => {
                debug!("agent {} finished ladder {}", self.id.0, m.ladder.0);
                self.stuck.reset();
                let next = self.path.cursor() + 1;
                self.set_path_cursor(ctx, next);
                false
            }
            Step::Abort => {
                warn!("agent {} abandoned ladder {}", self.id.0, m.ladder.0);
                self.path.clear();
                self.run();
                false
            }
        }
    }

    fn ladder_approach_ascent(&mut self, ctx: &mut TickCtx, m: &mut LadderMotion) -> Step {
        let tun = ctx.tun;
        let ladder = ctx.mesh.ladder(m.ladder);

        if self.on_ladder {
            // latched on early; just climb
            m.endpoint_z = climb_endpoint(ctx, ladder, true);
            self.run();
            return Step::Goto(LadderState::Ascend);
        }

        let to_goal = (m.goal - self.pos).xy();
        let range = to_goal.length();

        if range < tun.ladder.approach_walk_range {
            self.walk();
            self.stand();
        }

        // a raised ladder bottom needs a running jump to latch on
        if range < tun.ladder.approach_jump_range
            && ladder.bottom.z - self.pos.z > tun.body.step_height
            && self.vel.xy().length() > 1.0
        {
            let vel_yaw = vec_to_yaw(self.vel.xy());
            let mount_yaw = vec_to_yaw(-ladder.normal);
            if yaws_close(vel_yaw, mount_yaw, tun.ladder.approach_angle_tolerance) {
                self.controls.jump = true;
            }
        }

        if range < tun.ladder.close_to_goal {
            // start turning toward the rungs on the transition tick
            let centroid = self.centroid(tun);
            self.controls.face_yaw =
                Some(vec_to_yaw((ladder.pos_at_height(centroid.z) - centroid).xy()));
            return Step::Goto(LadderState::FaceAscent);
        }
        self.controls.face_yaw = Some(vec_to_yaw(to_goal));
        self.move_towards(m.goal);
        Step::Stay
    }

    fn ladder_approach_descent(&mut self, ctx: &mut TickCtx, m: &mut LadderMotion) -> Step {
        let tun = ctx.tun;
        let ladder = ctx.mesh.ladder(m.ladder);

        // already down (fell, or the geometry let us drop): skip the climb
        if self.pos.z <= ladder.bottom.z + tun.body.half_height {
            m.goal = self.ladder_bottom_destination(ctx, m);
            return Step::Goto(LadderState::MoveToDestination);
        }

        if self.on_ladder {
            m.endpoint_z = climb_endpoint(ctx, ladder, false);
            self.run();
            return Step::Goto(LadderState::Descend);
        }

        let to_goal = (m.goal - self.pos).xy();
        let range = to_goal.length();
        if !self.is_crouching() && range < tun.ladder.descend_walk_range {
            self.walk();
        }
        if range < tun.ladder.close_to_goal {
            let centroid = self.centroid(tun);
            self.controls.face_yaw =
                Some(vec_to_yaw((ladder.pos_at_height(centroid.z) - centroid).xy()));
            return Step::Goto(LadderState::FaceDescent);
        }
        self.controls.face_yaw = Some(vec_to_yaw(to_goal));
        self.move_towards(m.goal);
        Step::Stay
    }

    fn ladder_face_ascent(&mut self, ctx: &mut TickCtx, m: &mut LadderMotion) -> Step {
        let tun = ctx.tun;
        let ladder = ctx.mesh.ladder(m.ladder);

        m.dismount = if ladder.top_left == Some(m.dest_cell) {
            DismountDir::Left
        } else if ladder.top_right == Some(m.dest_cell) {
            DismountDir::Right
        } else {
            DismountDir::Forward
        };

        let centroid = self.centroid(tun);
        let to_ladder = (ladder.pos_at_height(centroid.z) - centroid).xy();
        let ideal = vec_to_yaw(to_ladder);
        self.controls.face_yaw = Some(ideal);

        if yaws_close(self.eye_yaw, ideal, tun.ladder.face_angle_tolerance) {
            self.run();
            self.stuck.reset();
            return Step::Goto(LadderState::MountAscent);
        }
        Step::Stay
    }

    fn ladder_face_descent(&mut self, ctx: &mut TickCtx, m: &mut LadderMotion) -> Step {
        let tun = ctx.tun;
        let ladder = ctx.mesh.ladder(m.ladder);

        let centroid = self.centroid(tun);
        let to_ladder = (ladder.pos_at_height(centroid.z) - centroid).xy();
        let ideal = vec_to_yaw(to_ladder);
        self.controls.face_yaw = Some(ideal);

        if yaws_close(self.eye_yaw, ideal, tun.ladder.face_angle_tolerance) {
            self.run();
            self.stuck.reset();
            return Step::Goto(LadderState::MountDescent);
        }
        Step::Stay
    }

    fn ladder_mount_ascent(&mut self, ctx: &mut TickCtx, m: &mut LadderMotion) -> Step {
        let tun = ctx.tun;
        let ladder = ctx.mesh.ladder(m.ladder);

        if self.on_ladder {
            m.endpoint_z = climb_endpoint(ctx, ladder, true);
            return Step::Goto(LadderState::Ascend);
        }

        if ladder.bottom.z - self.pos.z > tun.body.step_height {
            self.controls.jump = true;
        }
        // press straight into the rungs
        self.controls.face_yaw = Some(vec_to_yaw(-ladder.normal));
        self.move_towards(ladder.pos_at_height(self.pos.z));
        Step::Stay
    }

    fn ladder_mount_descent(&mut self, ctx: &mut TickCtx, m: &mut LadderMotion) -> Step {
        let tun = ctx.tun;
        let ladder = ctx.mesh.ladder(m.ladder);

        // the ledge was short enough to just fall
        if self.pos.z <= ladder.bottom.z + tun.body.half_height && !self.airborne {
            m.goal = self.ladder_bottom_destination(ctx, m);
            return Step::Goto(LadderState::MoveToDestination);
        }

        if self.on_ladder {
            m.endpoint_z = climb_endpoint(ctx, ladder, false);
            return Step::Goto(LadderState::Descend);
        }

        self.controls.face_yaw = Some(vec_to_yaw(-ladder.normal));
        self.move_towards(ladder.pos_at_height(self.pos.z));
        Step::Stay
    }

    fn ladder_ascend(&mut self, ctx: &mut TickCtx, m: &mut LadderMotion) -> Step {
        let tun = ctx.tun;
        let ladder = ctx.mesh.ladder(m.ladder);

        if !self.on_ladder {
            // slipped off mid-climb
            return Step::Abort;
        }

        self.run();
        if ctx.mesh.cell(m.dest_cell).has(CellFlags::CROUCH) {
            self.crouch();
        }

        if self.pos.z >= m.endpoint_z {
            return Step::Goto(LadderState::DismountTop);
        }

        // drift toward the dismount side while climbing
        let lat = lateral_of_facing(ladder.normal, m.dismount);
        let target = (ladder.pos_at_height(ladder.top.z).xy() + lat * tun.body.half_width)
            .extend(ladder.top.z);
        self.controls.face_yaw = Some(vec_to_yaw(-ladder.normal));
        self.move_towards(target);
        Step::Stay
    }

    fn ladder_descend(&mut self, ctx: &mut TickCtx, m: &mut LadderMotion) -> Step {
        let tun = ctx.tun;
        let ladder = ctx.mesh.ladder(m.ladder);

        let no_jump = ctx.mesh.cell(m.dest_cell).has(CellFlags::NO_JUMP);
        let release_z = m.endpoint_z + if no_jump { 0.0 } else { tun.body.half_height };

        if !self.on_ladder || self.pos.z <= release_z {
            m.goal = self.ladder_bottom_destination(ctx, m);
            return Step::Goto(LadderState::MoveToDestination);
        }

        self.run();
        self.controls.face_yaw = Some(vec_to_yaw(-ladder.normal));
        self.move_towards(ladder.bottom);
        Step::Stay
    }

    fn ladder_dismount_top(&mut self, ctx: &mut TickCtx, m: &mut LadderMotion) -> Step {
        let tun = ctx.tun;
        let ladder = ctx.mesh.ladder(m.ladder);

        if ctx.now - m.dismount_at >= tun.ladder.dismount_dwell {
            m.goal = ctx
                .mesh
                .cell(m.dest_cell)
                .closest_point(self.centroid(tun));
            return Step::Goto(LadderState::MoveToDestination);
        }

        // keep pushing over the lip toward the destination side
        let forward = -ladder.normal;
        let dir = match m.dismount {
            DismountDir::Forward => forward,
            DismountDir::Left => lateral_of_facing(ladder.normal, DismountDir::Left),
            DismountDir::Right => lateral_of_facing(ladder.normal, DismountDir::Right),
        };
        self.controls.face_yaw = Some(vec_to_yaw(forward));
        self.move_towards(self.pos + (dir * 50.0).extend(0.0));
        Step::Stay
    }

    fn ladder_move_to_destination(&mut self, ctx: &mut TickCtx, m: &LadderMotion) -> Step {
        if ctx.mesh.cell(m.dest_cell).contains(self.pos) {
            return Step::Done;
        }
        self.controls.face_yaw = Some(vec_to_yaw((m.goal - self.pos).xy()));
        self.move_towards(m.goal);
        Step::Stay
    }

    /// Where to walk after reaching the bottom: into the destination
    /// cell, standing off the climbing surface
    fn ladder_bottom_destination(&self, ctx: &TickCtx, m: &LadderMotion) -> Vec3 {
        let ladder = ctx.mesh.ladder(m.ladder);
        let off = (ladder.normal * 2.0 * ctx.tun.body.half_width).extend(0.0);
        ctx.mesh.cell(m.dest_cell).closest_point(ladder.bottom + off)
    }
}

/// Feet height at which a climb ends. A probe at chest height runs along
/// the ladder; intervening geometry shortens the climbable span.
fn climb_endpoint(ctx: &TickCtx, ladder: &Ladder, ascending: bool) -> f32 {
    let lift = Vec3::Z * ctx.tun.body.half_height;
    let (from, to) = if ascending {
        (ladder.bottom + lift, ladder.top + lift)
    } else {
        (ladder.top + lift, ladder.bottom + lift)
    };
    let fraction = ctx.trace.line_fraction(from, to).clamp(0.0, 1.0);
    from.z + (to.z - from.z) * fraction - ctx.tun.body.half_height
}

/// Lateral unit vector relative to a climber facing the ladder
/// (facing along `-normal`)
fn lateral_of_facing(normal: Vec2, side: DismountDir) -> Vec2 {
    let facing = -normal;
    let left = Vec2::new(-facing.y, facing.x);
    match side {
        DismountDir::Left => left,
        DismountDir::Right => -left,
        DismountDir::Forward => Vec2::ZERO,
    }
}
