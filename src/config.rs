//! Tunable thresholds for movement, pathing, and combat
//!
//! Every distance, timeout, and probability the decision engine relies on
//! lives here rather than being hard-coded at the point of use, so a game
//! can re-tune agents without recompiling. Supports loading from RON or
//! JSON files.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Agent body dimensions and movement speeds, in world units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyTunables {
    /// Half of the agent's collision width
    pub half_width: f32,
    /// Half of the agent's standing height
    pub half_height: f32,
    /// Maximum ledge height that can be stepped over without jumping
    pub step_height: f32,
    /// Maximum height reachable with a plain jump
    pub jump_height: f32,
    /// Maximum height reachable with a crouch-jump
    pub jump_crouch_height: f32,
    /// Ground speed while running
    pub run_speed: f32,
    /// Ground speed while walking
    pub walk_speed: f32,
    /// Ground speed while crouched
    pub crouch_speed: f32,
    /// Vertical speed while climbing a ladder
    pub climb_speed: f32,
}

impl Default for BodyTunables {
    fn default() -> Self {
        Self {
            half_width: 16.0,
            half_height: 36.0,
            step_height: 18.0,
            jump_height: 41.8,
            jump_crouch_height: 58.0,
            run_speed: 250.0,
            walk_speed: 130.0,
            crouch_speed: 85.0,
            climb_speed: 200.0,
        }
    }
}

/// Planner and follower thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathTunables {
    /// Hard cap on path node count (terminal node included)
    pub max_path_length: usize,
    /// Repath throttle window, lower bound (seconds)
    pub repath_interval_min: f32,
    /// Repath throttle window, upper bound (seconds)
    pub repath_interval_max: f32,
    /// How far a resolved waypoint steps into its destination cell
    pub step_in_dist: f32,
    /// How far a jump-down waypoint is pushed past the ledge
    pub jump_down_push: f32,
    /// Steering look-ahead distance along the path
    pub ahead_range: f32,
    /// Camera/aim look-ahead distance along the path
    pub look_ahead_range: f32,
    /// Segment direction dot-product below which a corner forces a stop
    pub corner_dot_cutoff: f32,
    /// Step size when interpolating back toward the last visible point
    pub sight_step: f32,
    /// 2D distance under which a waypoint counts as reached
    pub close_epsilon: f32,
    /// Minimum forward offset of the steering point, to avoid wiggling
    pub min_advance_range: f32,
    /// Distance from the terminal point at which the agent slows to a walk
    pub walk_range: f32,
    /// Distance from the terminal point under which feelers are suppressed
    pub near_end_range: f32,
    /// Distance from the terminal point at which the path is complete
    pub arrive_epsilon: f32,
    /// Forward scan distance for proactive crouching
    pub crouch_range: f32,
    /// Seconds without cell progress before the path is abandoned
    pub give_up_duration: f32,
    /// 2D range for the unreachable-goal fall check
    pub fall_close_range: f32,
    /// Search radius when re-anchoring to the nearest cell
    pub snap_radius: f32,
    /// Maximum height a re-anchor candidate may sit above the agent
    pub snap_height: f32,
    /// Feeler probe length while running
    pub feeler_length_run: f32,
    /// Feeler probe length while walking
    pub feeler_length_walk: f32,
    /// Feeler probe length while crouched
    pub feeler_length_crouch: f32,
    /// Lateral offset of each feeler from the agent's center
    pub feeler_offset: f32,
    /// Lateral feeler offset while crouched
    pub feeler_offset_crouch: f32,
    /// Half-extent of the swept feeler hull
    pub feeler_hull: f32,
    /// Lateral veer distance applied when one feeler is blocked
    pub avoid_range: f32,
    /// Lateral veer distance while crouched
    pub avoid_range_crouch: f32,
    /// Radius of the agent's personal space for friend blocking
    pub personal_space: f32,
    /// Body radius used when testing friend overlap with the move segment
    pub friend_radius: f32,
    /// Interval between friend-blocking checks (seconds)
    pub friend_check_interval: f32,
    /// Base patience when waiting behind a friend (seconds)
    pub polite_base: f32,
    /// Patience subtracted per unit of aggression (seconds)
    pub polite_aggression_scale: f32,
    /// Wait time range when the path ahead crosses a damaging cell
    pub damaging_wait_min: f32,
    pub damaging_wait_max: f32,
}

impl Default for PathTunables {
    fn default() -> Self {
        Self {
            max_path_length: 256,
            repath_interval_min: 0.4,
            repath_interval_max: 0.6,
            step_in_dist: 5.0,
            jump_down_push: 75.0,
            ahead_range: 300.0,
            look_ahead_range: 500.0,
            corner_dot_cutoff: 0.5,
            sight_step: 25.0,
            close_epsilon: 20.0,
            min_advance_range: 50.0,
            walk_range: 200.0,
            near_end_range: 50.0,
            arrive_epsilon: 20.0,
            crouch_range: 50.0,
            give_up_duration: 4.0,
            fall_close_range: 75.0,
            snap_radius: 500.0,
            snap_height: 120.0,
            feeler_length_run: 25.0,
            feeler_length_walk: 15.0,
            feeler_length_crouch: 20.0,
            feeler_offset: 10.0,
            feeler_offset_crouch: 5.0,
            feeler_hull: 10.0,
            avoid_range: 300.0,
            avoid_range_crouch: 150.0,
            personal_space: 100.0,
            friend_radius: 30.0,
            friend_check_interval: 0.5,
            polite_base: 5.0,
            polite_aggression_scale: 3.0,
            damaging_wait_min: 0.5,
            damaging_wait_max: 1.5,
        }
    }
}

/// Ladder traversal thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LadderTunables {
    /// Per-attempt timeout; exceeding it aborts the traversal (seconds)
    pub timeout: f32,
    /// Dwell after topping out before moving to the destination (seconds)
    pub dismount_dwell: f32,
    /// Lateral tolerance when approaching the mount point
    pub mount_tolerance: f32,
    /// 2D range under which the mount point counts as reached
    pub close_to_goal: f32,
    /// Range at which the approach slows to a walk
    pub approach_walk_range: f32,
    /// Range under which a height-gapped mount triggers a jump
    pub approach_jump_range: f32,
    /// Yaw tolerance while approaching (degrees)
    pub approach_angle_tolerance: f32,
    /// Yaw tolerance required before mounting (degrees)
    pub face_angle_tolerance: f32,
    /// Walk range when approaching a descent from the side
    pub descend_walk_range: f32,
    /// 2D drift from the ladder that counts as having missed it
    pub missed_range: f32,
    /// Back-off range when another agent occupies the ladder
    pub occupied_backoff_range: f32,
}

impl Default for LadderTunables {
    fn default() -> Self {
        Self {
            timeout: 10.0,
            dismount_dwell: 0.4,
            mount_tolerance: 10.0,
            close_to_goal: 25.0,
            approach_walk_range: 50.0,
            approach_jump_range: 100.0,
            approach_angle_tolerance: 15.0,
            face_angle_tolerance: 5.0,
            descend_walk_range: 150.0,
            missed_range: 200.0,
            occupied_backoff_range: 100.0,
        }
    }
}

/// Combat decision thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatTunables {
    /// Dodge state dwell range (seconds)
    pub dodge_dwell_min: f32,
    pub dodge_dwell_max: f32,
    /// Seconds of being aimed at before the agent counts as pinned down
    pub pinned_down_duration: f32,
    /// Cooldown between retreat decisions (seconds)
    pub retreat_cooldown: f32,
    /// Time-since-seen beyond which the enemy counts as hidden (seconds)
    pub hidden_after: f32,
    /// Time-since-seen beyond which the agent chases or disengages
    pub chase_after: f32,
    /// Extra chase patience for precision-weapon users (seconds)
    pub sniper_chase_bonus: f32,
    /// Base reaction delay before re-engaging a briefly hidden enemy
    pub reaction_delay: f32,
    /// How long the grenade trigger may be held before aborting (seconds)
    pub grenade_hold_timeout: f32,
    /// Delay between lining up and committing a throw (seconds)
    pub grenade_commit_delay: f32,
    /// Grenade blast radius used for the friendly-fire cone
    pub blast_radius: f32,
    /// Cosine of the blast cone half-angle
    pub blast_cone_dot: f32,
    /// Search radius when picking a hidden retreat spot
    pub hide_search_radius: f32,
    /// Effective melee range
    pub melee_range: f32,
}

impl Default for CombatTunables {
    fn default() -> Self {
        Self {
            dodge_dwell_min: 0.3,
            dodge_dwell_max: 1.0,
            pinned_down_duration: 7.0,
            retreat_cooldown: 10.0,
            hidden_after: 0.125,
            chase_after: 0.5,
            sniper_chase_bonus: 2.0,
            reaction_delay: 0.4,
            grenade_hold_timeout: 3.0,
            grenade_commit_delay: 0.3,
            blast_radius: 300.0,
            blast_cone_dot: 0.7,
            hide_search_radius: 750.0,
            melee_range: 64.0,
        }
    }
}

/// The full tunable set, grouped by concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tunables {
    #[serde(default)]
    pub body: BodyTunables,
    #[serde(default)]
    pub path: PathTunables,
    #[serde(default)]
    pub ladder: LadderTunables,
    #[serde(default)]
    pub combat: CombatTunables,
}

impl Tunables {
    /// Load tunables from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        ron::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load tunables from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save tunables to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, text).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

/// Errors that can occur while loading or saving tunables
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// File could not be read or written
    Io(String),
    /// Contents could not be parsed or serialized
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "config io error: {msg}"),
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
