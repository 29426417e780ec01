//! Path following
//!
//! Each tick the follower picks a steering point ahead on the path,
//! adjusts it for local obstacles with feeler probes, yields to
//! teammates in the way, and watches for falls and lack of progress.

use glam::{Vec3, Vec3Swizzles};
use log::{debug, warn};
use rand::Rng;

use crate::agent::{Agent, vec_to_yaw, yaw_to_vec};
use crate::nav::{CellFlags, NavMesh};
use crate::sim::TickCtx;

use super::{How, Path};

/// Outcome of one follower tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowResult {
    /// There is no path to follow
    NoPath,
    /// Still moving along the path
    Progressing,
    /// The terminal point was reached; the path has been cleared
    EndOfPath,
    /// Progress stalled or the agent fell off the route; the path has
    /// been cleared and the caller should replan
    GaveUp,
}

/// Nodes the steering point must not scan past: ladder traversals and
/// cells that demand exact movement
fn pinned_node(mesh: &NavMesh, path: &Path, index: usize) -> bool {
    let node = path.node(index);
    node.ladder.is_some()
        || mesh
            .cell(node.cell)
            .flags()
            .intersects(CellFlags::JUMP | CellFlags::PRECISE | CellFlags::STOP)
}

fn dist2d(a: Vec3, b: Vec3) -> f32 {
    a.xy().distance(b.xy())
}

fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

impl Agent {
    /// Drop the current path and any ladder traversal in progress
    pub fn destroy_path(&mut self) {
        self.path.clear();
        self.ladder_motion = None;
    }

    /// Advance the cursor; entering a ladder node arms the traversal
    pub(crate) fn set_path_cursor(&mut self, ctx: &mut TickCtx, index: usize) {
        self.path.set_cursor(index);
        if !self.path.is_valid() {
            return;
        }
        if self.path.node(self.path.cursor()).ladder.is_some() && self.ladder_motion.is_none() {
            self.begin_ladder_motion(ctx);
        }
    }

    /// Follow the current path for one tick, filling movement intents
    pub fn follow_path(&mut self, ctx: &mut TickCtx) -> FollowResult {
        if !self.path.is_valid() {
            return FollowResult::NoPath;
        }

        if self.ladder_motion.is_some() {
            if self.update_ladder(ctx) {
                return FollowResult::Progressing;
            }
            if !self.path.is_valid() {
                // the traversal aborted and tore the path down
                return FollowResult::GaveUp;
            }
        } else if self.on_ladder {
            // latched onto a ladder the path does not use; get off it
            self.controls.must_jump = true;
        }

        let tun = ctx.tun;

        // holding for a hazard to pass
        if !self.wait.is_elapsed(ctx.now) {
            self.stuck.reset();
            self.controls.face_yaw = Some(self.look_ahead_yaw);
            return FollowResult::Progressing;
        }

        // arrival handling once the cursor is on the final node
        let mut near_end = false;
        if self.path.cursor() + 1 >= self.path.len() {
            let range = dist2d(self.path.end_pos(), self.pos);
            if range < tun.path.walk_range && !self.is_crouching() {
                self.walk();
            }
            if range < tun.path.near_end_range {
                near_end = true;
            }
            if range < tun.path.arrive_epsilon {
                debug!("agent {} arrived", self.id.0);
                self.destroy_path();
                self.run();
                return FollowResult::EndOfPath;
            }
        }

        let (point, new_cursor, prev_index) = self.find_ahead_point(ctx);
        if new_cursor > self.path.cursor() {
            self.set_path_cursor(ctx, new_cursor);
            if self.ladder_motion.is_some() {
                return FollowResult::Progressing;
            }
        }
        self.goal_pos = point;

        self.update_stance(ctx, prev_index);
        self.forward_yaw = vec_to_yaw((point - self.pos).xy());
        let waiting_for_ladder = self.update_look_ahead(ctx);
        self.controls.face_yaw = Some(self.look_ahead_yaw);

        // local obstacle avoidance, suppressed when precision matters
        let move_goal = if near_end || self.airborne || self.is_near_jump(ctx) {
            point
        } else {
            self.feeler_adjust(ctx, point)
        };

        // stop-attributed cells demand a full halt before leaving
        if let Some(id) = self.cell {
            let cell = ctx.mesh.cell(id);
            let (min, max) = cell.extent();
            let leaving = move_goal.x < min.x
                || move_goal.x > max.x
                || move_goal.y < min.y
                || move_goal.y > max.y;
            if cell.has(CellFlags::STOP) && leaving && self.vel.xy().length_squared() > 1.0 {
                self.stuck.reset();
                return FollowResult::Progressing;
            }
        }

        // yield to teammates crossing our line, with limited patience
        let blocked = self.friend_in_the_way(ctx, point);
        if blocked && !self.waiting_behind_friend {
            self.waiting_behind_friend = true;
            let patience = (tun.path.polite_base
                - tun.path.polite_aggression_scale * self.profile.aggression)
                .max(0.0);
            self.polite.start(ctx.now, patience);
        } else if !blocked {
            self.waiting_behind_friend = false;
        }

        if !waiting_for_ladder && (!self.waiting_behind_friend || self.polite.is_elapsed(ctx.now))
        {
            self.move_towards(move_goal);
            if self.stuck.is_stuck() && !self.airborne {
                self.controls.wiggle = true;
            }
        } else {
            self.stuck.reset();
        }

        if self.check_fall(ctx) || self.cell_entered.elapsed(ctx.now) > tun.path.give_up_duration {
            warn!("agent {} gave up on its path", self.id.0);
            self.run();
            self.stand();
            self.destroy_path();
            self.cell = ctx
                .mesh
                .nearest_cell(self.pos, tun.path.snap_radius, tun.path.snap_height);
            self.cell_entered.start(ctx.now);
            return FollowResult::GaveUp;
        }

        FollowResult::Progressing
    }

    /// Closest point on any path segment we can see and walk straight to.
    /// Returns the segment's start index and the point.
    fn find_our_position_on_path(&self, ctx: &TickCtx) -> Option<(usize, Vec3)> {
        let eyes = self.eye(ctx.tun);
        let feet = self.pos;
        let mut best: Option<(usize, Vec3, f32)> = None;

        for i in 1..self.path.len() {
            let from = self.path.node(i - 1).pos;
            let to = self.path.node(i).pos;
            let close = closest_point_on_segment(from, to, feet);

            if close.z - feet.z > ctx.tun.body.jump_crouch_height {
                continue;
            }
            let probe = close + Vec3::Z * ctx.tun.body.half_height;
            if !ctx.trace.line_clear(eyes, probe) {
                continue;
            }
            if !self.straight_line_walkable(ctx, close) {
                continue;
            }
            let d = feet.distance_squared(close);
            if best.is_none_or(|(_, _, bd)| d < bd) {
                best = Some((i - 1, close, d));
            }
        }

        best.map(|(i, p, _)| (i, p))
    }

    /// Pick the steering point: as far ahead along the path as the
    /// ahead-range allows, pulled back by corners, hazards, visibility,
    /// and pinned nodes. Returns (point, new cursor, closest index).
    fn find_ahead_point(&mut self, ctx: &mut TickCtx) -> (Vec3, usize, usize) {
        let tun = ctx.tun;
        let len = self.path.len();
        let cursor = self.path.cursor();
        let feet = self.pos;

        let Some((close_index, close)) = self.find_our_position_on_path(ctx) else {
            return (self.goal_pos, cursor, cursor.saturating_sub(1));
        };
        let prev = close_index;

        // crouched movement tracks the waypoints exactly
        if self.is_crouching() {
            let mut i = (close_index + 1).min(len - 1);
            while i < len - 1 && dist2d(self.path.node(i).pos, close) < tun.path.close_epsilon {
                i += 1;
            }
            return (self.path.node(i).pos, i, prev);
        }

        // skip waypoints we are effectively standing on
        let mut start = close_index;
        while start < len - 1
            && dist2d(self.path.node(start + 1).pos, close) < tun.path.close_epsilon
        {
            start += 1;
        }
        if start > cursor && pinned_node(ctx.mesh, &self.path, start) {
            return (self.path.node(start).pos, start, prev);
        }
        start = (start + 1).min(len - 1);
        if pinned_node(ctx.mesh, &self.path, start) {
            return (self.path.node(start).pos, start, prev);
        }

        // march ahead accumulating 2D range until something pins the point
        let eyes = self.eye(tun);
        let init_dir = (self.path.node(start).pos - close).xy().normalize_or_zero();
        let mut prev_dir = init_dir;
        let mut seg_from = close;
        let mut range_so_far = 0.0;
        let mut index = start;
        let mut point = self.path.node(start).pos;
        let mut pinned = false;
        let mut visible = true;

        let mut i = start;
        while i < len {
            let pos = self.path.node(i).pos;
            let seg = dist2d(seg_from, pos);
            let dir = (pos - seg_from).xy().normalize_or_zero();

            // hold short of a hazard cell instead of marching into it
            if ctx.mesh.cell(self.path.node(i).cell).is_damaging()
                && range_so_far < tun.path.min_advance_range * 2.0
            {
                let dwell = ctx
                    .rng
                    .gen_range(tun.path.damaging_wait_min..=tun.path.damaging_wait_max);
                self.wait.start(ctx.now, dwell);
                index = i;
                point = if i > start {
                    self.path.node(i - 1).pos
                } else {
                    pos
                };
                pinned = true;
                break;
            }

            // reversals and sharp corners pin the point at the corner
            if dir.dot(init_dir) < 0.0 || dir.dot(prev_dir) < tun.path.corner_dot_cutoff {
                index = i;
                point = if i > start {
                    self.path.node(i - 1).pos
                } else {
                    pos
                };
                pinned = true;
                break;
            }
            prev_dir = dir;

            let probe = pos + Vec3::Z * tun.body.half_height;
            if !ctx.trace.line_clear(eyes, probe) {
                visible = false;
                index = i;
                point = pos;
                break;
            }

            if i > start && pinned_node(ctx.mesh, &self.path, i) {
                index = i;
                point = pos;
                pinned = true;
                break;
            }

            range_so_far += seg;
            index = i;
            point = pos;
            if range_so_far >= tun.path.ahead_range {
                break;
            }
            seg_from = pos;
            i += 1;
        }

        // land exactly on the ahead horizon
        if !pinned && visible && range_so_far > tun.path.ahead_range {
            let seg = dist2d(seg_from, point);
            if seg > f32::EPSILON {
                let t = 1.0 - (range_so_far - tun.path.ahead_range) / seg;
                point = seg_from.lerp(point, t.clamp(0.0, 1.0));
            }
        }

        // pull an occluded point back to the last visible spot
        if !visible {
            let from = if index > start {
                self.path.node(index - 1).pos
            } else {
                close
            };
            let seg = dist2d(from, point);
            let step = if seg > f32::EPSILON {
                tun.path.sight_step / seg
            } else {
                1.0
            };
            let mut t = 1.0 - step;
            let mut found = from;
            while t > 0.0 {
                let candidate = from.lerp(point, t);
                if ctx
                    .trace
                    .line_clear(eyes, candidate + Vec3::Z * tun.body.half_height)
                {
                    found = candidate;
                    break;
                }
                t -= step;
            }
            point = found;
        }

        // the point must pull us forward, not backward or nowhere
        if !pinned {
            let to_point = (point - feet).xy();
            if to_point.dot(init_dir) < 0.0 || to_point.length() < tun.path.min_advance_range {
                let mut j = index;
                while j < len - 1 {
                    j += 1;
                    if dist2d(self.path.node(j).pos, feet) > tun.path.min_advance_range
                        || pinned_node(ctx.mesh, &self.path, j)
                    {
                        break;
                    }
                }
                point = self.path.node(j).pos;
            }
        }

        (point, start, prev)
    }

    /// Crouch proactively when a crouch cell is coming up, stand otherwise
    fn update_stance(&mut self, ctx: &TickCtx, from_index: usize) {
        let tun = ctx.tun;
        let centroid = self.centroid(tun);
        let mut crouch = false;

        for i in from_index..self.path.len() {
            let cell = ctx.mesh.cell(self.path.node(i).cell);
            // an upcoming jump cell above us means jumping, not crouching
            if cell.has(CellFlags::JUMP) && cell.center().z > self.pos.z {
                break;
            }
            let close = cell.closest_point(centroid);
            if dist2d(close, centroid) > tun.path.crouch_range {
                break;
            }
            if cell.has(CellFlags::CROUCH) {
                crouch = true;
                break;
            }
        }

        if crouch {
            self.crouch();
        } else if !self.airborne {
            self.stand();
        }
    }

    /// Aim the view further down the path than the feet are steering.
    /// Returns true when the agent should hold position because the
    /// ladder it is heading for is occupied.
    fn update_look_ahead(&mut self, ctx: &TickCtx) -> bool {
        let tun = ctx.tun;
        if self.is_crouching() {
            self.look_ahead_yaw = self.forward_yaw;
            return false;
        }

        let len = self.path.len();
        let cursor = self.path.cursor().max(1);
        let centroid = self.centroid(tun);
        let mut to_goal = self.path.node(cursor).pos - centroid;
        let mut waiting = false;

        if self.path.node(cursor).ladder.is_none()
            && !self.is_near_jump(ctx)
            && to_goal.xy().length() < tun.path.look_ahead_range
        {
            let mut along = to_goal.xy().length();
            let mut i = cursor + 1;
            while i < len {
                let node = *self.path.node(i);
                let seg = dist2d(self.path.node(i - 1).pos, node.pos);

                let special = node.ladder.is_some()
                    || ctx
                        .mesh
                        .cell(node.cell)
                        .flags()
                        .intersects(CellFlags::JUMP | CellFlags::PRECISE | CellFlags::STOP);
                if special {
                    to_goal = node.pos - centroid;
                    if let Some(lid) = node.ladder {
                        let occupied = ctx
                            .others
                            .iter()
                            .any(|o| o.id != self.id && o.ladder == Some(lid));
                        if occupied {
                            waiting = true;
                            self.stuck.reset();
                            if dist2d(self.pos, node.pos) < tun.ladder.occupied_backoff_range {
                                self.move_away_from(node.pos);
                            }
                        }
                    }
                    break;
                }

                along += seg;
                if along >= tun.path.look_ahead_range {
                    let t = if seg > f32::EPSILON {
                        1.0 - (along - tun.path.look_ahead_range) / seg
                    } else {
                        1.0
                    };
                    let p = self.path.node(i - 1).pos.lerp(node.pos, t.clamp(0.0, 1.0));
                    to_goal = p - centroid;
                    break;
                }
                to_goal = node.pos - centroid;
                i += 1;
            }
        }

        self.look_ahead_yaw = vec_to_yaw(to_goal.xy());
        waiting
    }

    /// True when the cursor sits on or just past a jump cell above us
    fn is_near_jump(&self, ctx: &TickCtx) -> bool {
        if !self.path.is_valid() {
            return false;
        }
        let cursor = self.path.cursor();
        let last = self.path.len() - 1;
        for i in cursor.saturating_sub(1)..=cursor.min(last) {
            let node = self.path.node(i);
            if ctx.mesh.cell(node.cell).has(CellFlags::JUMP) && node.pos.z > self.pos.z {
                return true;
            }
        }
        false
    }

    /// Swing two short swept-hull probes ahead of the agent; when one
    /// side hits, veer the goal toward the clear side
    fn feeler_adjust(&mut self, ctx: &TickCtx, goal: Vec3) -> Vec3 {
        let tun = ctx.tun;
        if let Some(id) = self.cell {
            if ctx.mesh.cell(id).has(CellFlags::PRECISE) {
                return goal;
            }
        }

        let (length, offset, avoid) = if self.is_crouching() {
            (
                tun.path.feeler_length_crouch,
                tun.path.feeler_offset_crouch,
                tun.path.avoid_range_crouch,
            )
        } else if self.is_running() {
            (
                tun.path.feeler_length_run,
                tun.path.feeler_offset,
                tun.path.avoid_range,
            )
        } else {
            (
                tun.path.feeler_length_walk,
                tun.path.feeler_offset,
                tun.path.avoid_range,
            )
        };

        // tilt the probes to the local ground plane
        let normal = ctx
            .trace
            .ground(self.centroid(tun))
            .map_or(Vec3::Z, |g| g.normal);
        let flat = yaw_to_vec(self.forward_yaw).extend(0.0);
        let lat = normal.cross(flat).normalize_or_zero();
        let dir = lat.cross(normal).normalize_or_zero();

        let base = self.pos + Vec3::Z * (tun.body.step_height + 0.1);
        let hull = Vec3::new(
            tun.path.feeler_hull,
            tun.path.feeler_hull,
            (tun.body.half_height - tun.path.feeler_hull).max(1.0) * 0.5,
        );

        let left_from = base + lat * offset;
        let left_clear = ctx
            .trace
            .hull_clear(left_from, left_from + dir * length, hull);
        let right_from = base - lat * offset;
        let right_clear = ctx
            .trace
            .hull_clear(right_from, right_from + dir * length, hull);

        if !right_clear && left_clear {
            return goal + lat * avoid;
        }
        if !left_clear && right_clear {
            return goal - lat * avoid;
        }
        goal
    }

    /// Throttled check for a teammate standing in our movement lane
    fn friend_in_the_way(&mut self, ctx: &TickCtx, goal: Vec3) -> bool {
        let tun = ctx.tun;
        if !self.friend_check.is_elapsed(ctx.now) {
            return self.friend_in_way;
        }
        self.friend_check.start(ctx.now, tun.path.friend_check_interval);
        self.friend_in_way = false;

        let move_dir = (goal - self.pos).xy();
        let move_len = move_dir.length();
        if move_len < f32::EPSILON {
            return false;
        }
        let move_dir = move_dir / move_len;

        for other in ctx.others {
            if other.id == self.id || other.team != self.team {
                continue;
            }
            let to = (other.pos - self.pos).xy();
            let range = to.length();
            if range > tun.path.personal_space {
                continue;
            }
            let along = to.dot(move_dir);
            if along <= 0.0 {
                continue;
            }
            let lateral = (to - move_dir * along).length();
            if lateral < tun.path.friend_radius + tun.body.half_width {
                self.friend_in_way = true;
                break;
            }
        }
        self.friend_in_way
    }

    /// The steering point is high above and close by: we fell off the
    /// route (a ladder right ahead excuses the height gap)
    fn check_fall(&self, ctx: &TickCtx) -> bool {
        let tun = ctx.tun;
        if self.airborne {
            return false;
        }
        if self.goal_pos.z - self.pos.z <= tun.body.jump_crouch_height {
            return false;
        }
        if dist2d(self.goal_pos, self.pos) >= tun.path.fall_close_range {
            return false;
        }
        let cursor = self.path.cursor();
        let last = self.path.len() - 1;
        for i in cursor..=(cursor + 1).min(last) {
            let node = self.path.node(i);
            if node.how == How::LadderUp && node.pos.z - self.pos.z <= tun.body.jump_crouch_height
            {
                return false;
            }
        }
        true
    }

    /// Sample the ground along the straight line to `goal`; an
    /// unclimbable rise blocks it (drops are survivable and allowed)
    fn straight_line_walkable(&self, ctx: &TickCtx, goal: Vec3) -> bool {
        let tun = ctx.tun;
        let delta = (goal - self.pos).xy();
        let total = delta.length();
        if total < f32::EPSILON {
            return true;
        }
        let dir = delta / total;

        let mut along = 0.0;
        let mut z = self.pos.z;
        while along < total {
            along = (along + tun.path.sight_step).min(total);
            let probe = (self.pos.xy() + dir * along).extend(z + tun.body.half_height);
            let Some(ground) = ctx.trace.ground(probe) else {
                return false;
            };
            if ground.height - z > tun.body.jump_crouch_height {
                return false;
            }
            z = ground.height;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentId, Loadout, Profile};
    use crate::config::Tunables;
    use crate::nav::{NavMeshBuilder, Team};
    use crate::path::RouteKind;
    use crate::sim::{Aabb, AgentSnapshot, BlockedWorld, OpenWorld, TickCtx, TraceWorld};
    use glam::Vec2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn corridor(n: u32) -> NavMesh {
        let mut b = NavMeshBuilder::new();
        let mut prev = None;
        for i in 0..n {
            let x = i as f32 * 100.0;
            let id = b.add_cell(
                Vec2::new(x, 0.0),
                Vec2::new(x + 100.0, 100.0),
                0.0,
                CellFlags::empty(),
            );
            if let Some(p) = prev {
                b.connect(p, id);
            }
            prev = Some(id);
        }
        b.build()
    }

    fn agent() -> Agent {
        Agent::new(
            AgentId(0),
            Team::Alpha,
            Vec3::new(50.0, 50.0, 0.0),
            Profile::default(),
            Loadout::default(),
        )
    }

    struct Sim<'a> {
        mesh: &'a NavMesh,
        world: &'a dyn TraceWorld,
        tun: Tunables,
        rng: StdRng,
        now: f32,
    }

    impl<'a> Sim<'a> {
        fn new(mesh: &'a NavMesh, world: &'a dyn TraceWorld) -> Self {
            Self {
                mesh,
                world,
                tun: Tunables::default(),
                rng: StdRng::seed_from_u64(42),
                now: 0.0,
            }
        }

        fn ctx<'b>(&'b mut self, others: &'b [AgentSnapshot]) -> TickCtx<'b> {
            TickCtx {
                mesh: self.mesh,
                trace: self.world,
                tun: &self.tun,
                now: self.now,
                others,
                rng: &mut self.rng,
            }
        }
    }

    /// crude motion: teleport a step toward the movement intent
    fn step(agent: &mut Agent, dt: f32) {
        if let Some(to) = agent.controls.move_to {
            let delta = (to - agent.pos).xy();
            let dist = delta.length();
            if dist > f32::EPSILON {
                let speed = 250.0 * dt;
                let travel = speed.min(dist);
                agent.pos += (delta / dist * travel).extend(0.0);
            }
        }
        agent.controls.clear();
    }

    #[test]
    fn test_follower_reaches_end_of_corridor() {
        let mesh = corridor(5);
        let world = OpenWorld::new(&mesh);
        let mut sim = Sim::new(&mesh, &world);
        let mut bot = agent();
        bot.cell = Some(crate::nav::CellId(0));
        let goal = Vec3::new(450.0, 50.0, 0.0);

        bot.compute_path(&mut sim.ctx(&[]), goal, RouteKind::Fastest)
            .unwrap();

        let dt = 0.05;
        let mut arrived = false;
        let mut last_cursor = bot.path().cursor();
        for _ in 0..600 {
            sim.now += dt;
            bot.update_tracked_cell(&sim.ctx(&[]));
            let result = bot.follow_path(&mut sim.ctx(&[]));
            if result == FollowResult::EndOfPath {
                arrived = true;
                break;
            }
            assert_eq!(result, FollowResult::Progressing);
            // the cursor never moves backwards
            assert!(bot.path().cursor() >= last_cursor);
            last_cursor = bot.path().cursor();
            step(&mut bot, dt);
        }
        assert!(arrived, "agent never arrived: pos {:?}", bot.pos);
        assert!(!bot.has_path());
        assert!(bot.pos.distance(goal) < 60.0);
    }

    #[test]
    fn test_no_progress_gives_up() {
        let mesh = corridor(5);
        let world = OpenWorld::new(&mesh);
        let mut sim = Sim::new(&mesh, &world);
        let mut bot = agent();
        bot.cell = Some(crate::nav::CellId(0));

        bot.compute_path(
            &mut sim.ctx(&[]),
            Vec3::new(450.0, 50.0, 0.0),
            RouteKind::Fastest,
        )
        .unwrap();

        // never apply movement: the agent goes nowhere
        let dt = 0.1;
        let mut gave_up = false;
        for _ in 0..100 {
            sim.now += dt;
            bot.update_tracked_cell(&sim.ctx(&[]));
            if bot.follow_path(&mut sim.ctx(&[])) == FollowResult::GaveUp {
                gave_up = true;
                break;
            }
            bot.controls.clear();
        }
        assert!(gave_up);
        assert!(!bot.has_path());
    }

    #[test]
    fn test_waits_behind_friend_then_pushes_through() {
        let mesh = corridor(5);
        let world = OpenWorld::new(&mesh);
        let mut sim = Sim::new(&mesh, &world);
        let mut bot = agent();
        bot.cell = Some(crate::nav::CellId(0));
        bot.profile.aggression = 0.0; // maximum patience

        bot.compute_path(
            &mut sim.ctx(&[]),
            Vec3::new(450.0, 50.0, 0.0),
            RouteKind::Fastest,
        )
        .unwrap();

        // a teammate parked right in the lane, inside personal space
        let friend = AgentSnapshot {
            id: AgentId(1),
            team: Team::Alpha,
            pos: Vec3::new(110.0, 50.0, 0.0),
            ladder: None,
        };
        let others = [friend];

        sim.now += 0.1;
        bot.update_tracked_cell(&sim.ctx(&others));
        bot.follow_path(&mut sim.ctx(&others));
        assert!(bot.controls.move_to.is_none(), "should wait behind friend");

        // patience runs out (polite base is 5s at zero aggression)
        bot.controls.clear();
        sim.now += 6.0;
        bot.update_tracked_cell(&sim.ctx(&others));
        bot.follow_path(&mut sim.ctx(&others));
        assert!(bot.controls.move_to.is_some(), "patience expired, push on");
    }

    #[test]
    fn test_enemy_in_lane_is_ignored() {
        let mesh = corridor(5);
        let world = OpenWorld::new(&mesh);
        let mut sim = Sim::new(&mesh, &world);
        let mut bot = agent();
        bot.cell = Some(crate::nav::CellId(0));

        bot.compute_path(
            &mut sim.ctx(&[]),
            Vec3::new(450.0, 50.0, 0.0),
            RouteKind::Fastest,
        )
        .unwrap();

        let enemy = AgentSnapshot {
            id: AgentId(1),
            team: Team::Bravo,
            pos: Vec3::new(110.0, 50.0, 0.0),
            ladder: None,
        };
        let others = [enemy];
        sim.now += 0.1;
        bot.follow_path(&mut sim.ctx(&others));
        assert!(bot.controls.move_to.is_some());
    }

    #[test]
    fn test_crouch_cell_ahead_triggers_crouch() {
        let mut b = NavMeshBuilder::new();
        let a = b.add_cell(Vec2::ZERO, Vec2::new(100.0, 100.0), 0.0, CellFlags::empty());
        let duct = b.add_cell(
            Vec2::new(100.0, 0.0),
            Vec2::new(200.0, 100.0),
            0.0,
            CellFlags::CROUCH,
        );
        let c = b.add_cell(
            Vec2::new(200.0, 0.0),
            Vec2::new(300.0, 100.0),
            0.0,
            CellFlags::empty(),
        );
        b.connect(a, duct);
        b.connect(duct, c);
        let mesh = b.build();
        let world = OpenWorld::new(&mesh);
        let mut sim = Sim::new(&mesh, &world);
        let mut bot = agent();
        bot.cell = Some(a);
        bot.pos = Vec3::new(90.0, 50.0, 0.0); // within crouch range of the duct

        bot.compute_path(
            &mut sim.ctx(&[]),
            Vec3::new(250.0, 50.0, 0.0),
            RouteKind::Fastest,
        )
        .unwrap();

        sim.now += 0.1;
        bot.follow_path(&mut sim.ctx(&[]));
        assert!(bot.is_crouching());
    }

    #[test]
    fn test_blocked_feeler_veers_away() {
        let mesh = corridor(5);
        // a post just ahead and to the right of the agent's line
        let post = Aabb::new(Vec3::new(60.0, 20.0, 0.0), Vec3::new(80.0, 45.0, 72.0));
        let world = BlockedWorld::new(&mesh, vec![post]);
        let mut sim = Sim::new(&mesh, &world);
        let mut bot = agent();
        bot.cell = Some(crate::nav::CellId(0));
        bot.forward_yaw = 0.0; // facing east

        let goal = Vec3::new(200.0, 50.0, 0.0);
        let adjusted = bot.feeler_adjust(&sim.ctx(&[]), goal);
        // right feeler (south side, -Y) hits the post: veer left (north)
        assert!(adjusted.y > goal.y);
    }

    #[test]
    fn test_hazard_cell_arms_the_wait_timer() {
        let mesh = corridor(5);
        let world = OpenWorld::new(&mesh);
        let mut sim = Sim::new(&mesh, &world);
        let mut bot = agent();
        bot.cell = Some(crate::nav::CellId(0));

        bot.compute_path(
            &mut sim.ctx(&[]),
            Vec3::new(450.0, 50.0, 0.0),
            RouteKind::Fastest,
        )
        .unwrap();

        // fire breaks out on the next cell after planning
        let mut mesh2 = mesh.clone();
        mesh2.set_damaging(crate::nav::CellId(1), true);
        let world2 = OpenWorld::new(&mesh2);
        let mut sim2 = Sim::new(&mesh2, &world2);

        sim2.now = 0.1;
        bot.follow_path(&mut sim2.ctx(&[]));
        // the wait is armed; the next tick emits no movement
        bot.controls.clear();
        sim2.now = 0.2;
        bot.follow_path(&mut sim2.ctx(&[]));
        assert!(bot.controls.move_to.is_none());
    }
}
