//! Placement planning for actor batches.
//!
//! A [`BatchDescriptor`] expands into a lazily generated, restartable [`Plan`]
//! of [`PlannedPlacement`]s in ascending index order. Planning is pure; every
//! validation failure is raised by the descriptor constructors, never mid-plan.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ValidationError;
use crate::sequencer::spawns_actors;
use crate::types::ActorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
	X,
	Z,
}

/// One of the four horizontal directions, `+x`, `-x`, `+z` or `-z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Direction {
	axis: Axis,
	sign: i8,
}

const DIRECTIONS: [(&str, Direction); 4] = [
	("+x", Direction { axis: Axis::X, sign: 1 }),
	("-x", Direction { axis: Axis::X, sign: -1 }),
	("+z", Direction { axis: Axis::Z, sign: 1 }),
	("-z", Direction { axis: Axis::Z, sign: -1 }),
];

impl Direction {
	/// Offset of `steps` units of `spacing` along this direction.
	fn offset(self, steps: usize, spacing: f64) -> Offset {
		let distance = steps as f64 * spacing * f64::from(self.sign);
		match self.axis {
			Axis::X => Offset { x: Some(distance), z: None },
			Axis::Z => Offset { x: None, z: Some(distance) },
		}
	}
}

impl FromStr for Direction {
	type Err = ValidationError;

	fn from_str(token: &str) -> Result<Self, Self::Err> {
		DIRECTIONS
			.iter()
			.find(|(name, _)| *name == token)
			.map(|(_, dir)| *dir)
			.ok_or_else(|| ValidationError::UnknownDirection(token.to_string()))
	}
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let sign = if self.sign < 0 { '-' } else { '+' };
		let axis = match self.axis {
			Axis::X => 'x',
			Axis::Z => 'z',
		};
		write!(f, "{sign}{axis}")
	}
}

/// Horizontal displacement relative to the invocation frame.
///
/// An axis the shape never moves along is `None` and renders as a bare `~`;
/// a placed axis always carries its number, even at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offset {
	pub x: Option<f64>,
	pub z: Option<f64>,
}

impl Offset {
	/// Both axes placed at the frame origin.
	const ORIGIN: Self = Self { x: Some(0.0), z: Some(0.0) };

	fn plus(self, other: Self) -> Self {
		Self {
			x: add_component(self.x, other.x),
			z: add_component(self.z, other.z),
		}
	}

	/// Tilde-relative coordinates `~dx ~ ~dz`.
	pub fn tilde(self) -> String {
		format!("{} ~ {}", tilde_component(self.x), tilde_component(self.z))
	}
}

fn add_component(a: Option<f64>, b: Option<f64>) -> Option<f64> {
	match (a, b) {
		(None, None) => None,
		(a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
	}
}

fn tilde_component(value: Option<f64>) -> String {
	match value {
		// `+ 0.0` folds -0.0 into 0
		Some(value) => format!("~{}", value + 0.0),
		None => "~".to_string(),
	}
}

/// Arrangement of a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
	/// Every actor at the invocation frame, no positioning injected.
	Point,
	/// Actors spaced along one direction.
	Line { direction: Direction },
	/// Row-major grid: rows advance along `rows`, columns along `columns`.
	Grid { rows: Direction, columns: Direction, width: usize },
}

impl Shape {
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Point => "range",
			Self::Line { .. } => "line",
			Self::Grid { .. } => "grid",
		}
	}
}

/// Immutable description of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDescriptor {
	name_prefix: String,
	start: i64,
	end: i64,
	count: usize,
	shape: Shape,
	spacing: f64,
	action: String,
	follow_ups: Vec<String>,
}

impl BatchDescriptor {
	/// Actors `start..=end` at the invocation frame.
	pub fn range(name_prefix: impl Into<String>, start: i64, end: i64, action: impl Into<String>) -> Result<Self, ValidationError> {
		Self::build(name_prefix.into(), start, end, Shape::Point, 0.0, action.into())
	}

	/// Actors `start..=end` in a line along `direction`, `spacing` apart.
	pub fn line(name_prefix: impl Into<String>, start: i64, end: i64, direction: &str, spacing: f64, action: impl Into<String>) -> Result<Self, ValidationError> {
		let direction = direction.parse()?;
		Self::build(name_prefix.into(), start, end, Shape::Line { direction }, spacing, action.into())
	}

	/// Actors `start..=end` in a row-major grid.
	///
	/// Without an explicit `width` the grid is as square as possible
	/// (`ceil(sqrt(count))` columns).
	#[allow(clippy::too_many_arguments)]
	pub fn grid(
		name_prefix: impl Into<String>,
		start: i64,
		end: i64,
		rows: &str,
		columns: &str,
		spacing: f64,
		width: Option<usize>,
		action: impl Into<String>,
	) -> Result<Self, ValidationError> {
		let rows = rows.parse()?;
		let columns = columns.parse()?;
		let count = count_of(start, end)?;
		let width = match width {
			Some(0) => return Err(ValidationError::NonPositiveWidth),
			Some(width) => width,
			None => square_width(count),
		};
		Self::build(name_prefix.into(), start, end, Shape::Grid { rows, columns, width }, spacing, action.into())
	}

	fn build(name_prefix: String, start: i64, end: i64, shape: Shape, spacing: f64, action: String) -> Result<Self, ValidationError> {
		let count = count_of(start, end)?;
		if !spacing.is_finite() || spacing < 0.0 {
			return Err(ValidationError::InvalidSpacing(spacing));
		}
		let action = action.trim().to_string();
		if action.is_empty() {
			return Err(ValidationError::EmptyAction);
		}
		Ok(Self {
			name_prefix,
			start,
			end,
			count,
			shape,
			spacing,
			action,
			follow_ups: Vec::new(),
		})
	}

	/// Attaches follow-up actions run once each spawned actor is ready.
	///
	/// Only a spawning action can carry follow-ups; there is no readiness
	/// signal to wait for otherwise.
	pub fn with_follow_ups(mut self, follow_ups: impl IntoIterator<Item = String>) -> Result<Self, ValidationError> {
		let follow_ups: Vec<String> = follow_ups.into_iter().map(|a| a.trim().to_string()).filter(|a| !a.is_empty()).collect();
		if !follow_ups.is_empty() && !spawns_actors(&self.action) {
			return Err(ValidationError::FollowUpsWithoutSpawn(self.action));
		}
		self.follow_ups = follow_ups;
		Ok(self)
	}

	pub fn name_prefix(&self) -> &str {
		&self.name_prefix
	}

	pub const fn start(&self) -> i64 {
		self.start
	}

	/// Last index, inclusive.
	pub const fn end(&self) -> i64 {
		self.end
	}

	pub const fn count(&self) -> usize {
		self.count
	}

	pub const fn shape(&self) -> &Shape {
		&self.shape
	}

	pub const fn spacing(&self) -> f64 {
		self.spacing
	}

	pub fn action(&self) -> &str {
		&self.action
	}

	pub fn follow_ups(&self) -> &[String] {
		&self.follow_ups
	}

	/// Number of empty slots in the last grid row, if the grid is ragged.
	pub fn grid_shortfall(&self) -> Option<usize> {
		let Shape::Grid { width, .. } = self.shape else {
			return None;
		};
		match self.count % width {
			0 => None,
			filled => Some(width - filled),
		}
	}

	/// Plans placements with actor names prefixed by `base`.
	pub fn plan(&self, base: &str) -> Plan {
		Plan {
			base: base.to_string(),
			name_prefix: self.name_prefix.clone(),
			start: self.start,
			count: self.count,
			shape: self.shape,
			spacing: self.spacing,
			next: 0,
		}
	}

	/// Human label such as `bot_test[1-3]`.
	pub fn label(&self, base: &str) -> String {
		format!("{base}{}[{}-{}]", self.name_prefix, self.start, self.end)
	}
}

/// Serial spawn, act and kill lifecycle over `length` actors.
#[derive(Debug, Clone, PartialEq)]
pub struct InitDescriptor {
	name_prefix: String,
	start: i64,
	end: i64,
	length: usize,
	act: Duration,
	between: Duration,
	action: String,
}

impl InitDescriptor {
	/// Actors `start..start+length`, each running `action` once ready, held
	/// for `act_secs` before being killed, `between_secs` apart.
	pub fn new(name_prefix: impl Into<String>, start: i64, length: i64, act_secs: f64, between_secs: f64, action: impl Into<String>) -> Result<Self, ValidationError> {
		if length < 1 {
			return Err(ValidationError::NonPositiveLength(length));
		}
		let length = usize::try_from(length).map_err(|_| ValidationError::NonPositiveLength(length))?;
		let end = start.checked_add(length as i64 - 1).ok_or(ValidationError::InvalidRange { start, end: i64::MAX })?;
		let act = seconds(act_secs)?;
		let between = seconds(between_secs)?;
		let action = action.into().trim().to_string();
		if action.is_empty() {
			return Err(ValidationError::EmptyAction);
		}
		Ok(Self {
			name_prefix: name_prefix.into(),
			start,
			end,
			length,
			act,
			between,
			action,
		})
	}

	pub fn name_prefix(&self) -> &str {
		&self.name_prefix
	}

	pub const fn start(&self) -> i64 {
		self.start
	}

	pub const fn length(&self) -> usize {
		self.length
	}

	/// Hold time between readiness and the kill command.
	pub const fn act(&self) -> Duration {
		self.act
	}

	/// Pause between one actor's kill and the next actor's spawn.
	pub const fn between(&self) -> Duration {
		self.between
	}

	pub fn action(&self) -> &str {
		&self.action
	}

	/// Actor names and indices in lifecycle order, generated on demand.
	pub fn actors(&self, base: &str) -> impl ExactSizeIterator<Item = (i64, ActorId)> + use<> {
		let (base, name_prefix, start) = (base.to_string(), self.name_prefix.clone(), self.start);
		(0..self.length).map(move |n| {
			let index = start.wrapping_add_unsigned(n as u64);
			(index, ActorId::new(&base, &name_prefix, index))
		})
	}

	pub fn label(&self, base: &str) -> String {
		format!("{base}{}[{}-{}]", self.name_prefix, self.start, self.end)
	}
}

/// Converts user-supplied seconds, rejecting negative and non-finite values.
pub fn seconds(secs: f64) -> Result<Duration, ValidationError> {
	Duration::try_from_secs_f64(secs).map_err(|_| ValidationError::InvalidInterval(secs))
}

fn count_of(start: i64, end: i64) -> Result<usize, ValidationError> {
	if start > end {
		return Err(ValidationError::InvalidRange { start, end });
	}
	let count = end.abs_diff(start).checked_add(1).ok_or(ValidationError::InvalidRange { start, end })?;
	usize::try_from(count).map_err(|_| ValidationError::InvalidRange { start, end })
}

fn square_width(count: usize) -> usize {
	let mut width = (count as f64).sqrt() as usize;
	while width.saturating_mul(width) < count {
		width += 1;
	}
	width.max(1)
}

/// One actor and where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPlacement {
	pub actor: ActorId,
	pub index: i64,
	/// `None` for point batches, which carry no positioning.
	pub offset: Option<Offset>,
}

/// Lazy, finite placement sequence in ascending index order.
///
/// Cloning restarts from the clone point; a fresh plan comes from
/// [`BatchDescriptor::plan`].
#[derive(Debug, Clone)]
pub struct Plan {
	base: String,
	name_prefix: String,
	start: i64,
	count: usize,
	shape: Shape,
	spacing: f64,
	next: usize,
}

impl Plan {
	fn placement(&self, idx: usize) -> PlannedPlacement {
		// idx < count, so this never passes the descriptor's end
		let index = self.start.wrapping_add_unsigned(idx as u64);
		let offset = match self.shape {
			Shape::Point => None,
			Shape::Line { direction } => Some(direction.offset(idx, self.spacing)),
			Shape::Grid { rows, columns, width } => {
				let row = idx / width;
				let col = idx % width;
				Some(Offset::ORIGIN.plus(rows.offset(row, self.spacing)).plus(columns.offset(col, self.spacing)))
			}
		};
		PlannedPlacement {
			actor: ActorId::new(&self.base, &self.name_prefix, index),
			index,
			offset,
		}
	}
}

impl Iterator for Plan {
	type Item = PlannedPlacement;

	fn next(&mut self) -> Option<Self::Item> {
		if self.next >= self.count {
			return None;
		}
		let placement = self.placement(self.next);
		self.next += 1;
		Some(placement)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let left = self.count - self.next;
		(left, Some(left))
	}
}

impl ExactSizeIterator for Plan {}
