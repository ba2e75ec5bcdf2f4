// Copyright (c) 2022 Bastiaan Marinus van de Weerd

use crate::{map::GridMap, reach, step::Step};


/// Outcome of one scheduling tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tick {
	Won,
	Continuing,
	/// The stack emptied without a winning step: no solution exists.
	Exhausted,
}

const EXACT_INTERVAL_SEED: u64 = 16;
const EXACT_INTERVAL_MIN: u64 = 2;
const EXACT_INTERVAL_MAX: u64 = 1024;

/// Depth-first search over steps, one step per tick so a host can pace,
/// pause, or step it interactively. The step vector is arena and stack in
/// one: a step's parent handle is always its predecessor, so backtracking
/// is truncation and handles stay dense.
pub struct Solver<'a> {
	map: &'a GridMap,
	steps: Vec<Step>,
	iterations: u64,
	/// Ticks between runs of the exact reachability check; grown while the
	/// check keeps agreeing with the fast tier, shrunk when it catches the
	/// fast tier's optimism out.
	exact_interval: u64,
	since_exact: u64,
	rollbacks: u64,
	paused: bool,
}

impl<'a> Solver<'a> {
	pub fn new(map: &'a GridMap) -> Self {
		Solver {
			map,
			steps: vec![Step::root(map)],
			iterations: 0,
			exact_interval: EXACT_INTERVAL_SEED,
			since_exact: 0,
			rollbacks: 0,
			paused: false,
		}
	}

	pub fn iterations(&self) -> u64 {
		self.iterations
	}

	/// Current length of the step stack, i.e. cells on the route so far.
	pub fn depth(&self) -> usize {
		self.steps.len()
	}

	/// How often the exact check has truncated the stack.
	pub fn rollbacks(&self) -> u64 {
		self.rollbacks
	}

	pub fn is_paused(&self) -> bool {
		self.paused
	}

	pub fn pause(&mut self) {
		self.paused = true;
	}

	pub fn resume(&mut self) {
		self.paused = false;
	}

	/// Snapshot of the board with the route drawn over it, for display.
	pub fn current_route(&self) -> String {
		match self.steps.last() {
			Some(step) => step.route.render(),
			None => String::new(),
		}
	}

	/// Advance the search by one step or backtrack. A paused solver does
	/// nothing; cancellation is simply the host not calling this again.
	pub fn tick(&mut self) -> Tick {
		if self.paused { return Tick::Continuing }
		let Some(top) = self.steps.len().checked_sub(1) else { return Tick::Exhausted };
		self.iterations += 1;

		if self.steps[top].is_win(self.map) {
			#[cfg(LOGGING)]
			println!("solved in {} iterations", self.iterations);
			return Tick::Won
		}

		let dead = self.steps[top].is_dead_end(self.map, &self.steps);

		self.since_exact += 1;
		if !dead && self.since_exact >= self.exact_interval {
			self.since_exact = 0;
			if self.exact_at(top) {
				// Expensive checks have been unnecessary lately; relax.
				self.exact_interval = (self.exact_interval * 2).min(EXACT_INTERVAL_MAX);
			} else {
				return self.rollback(top)
			}
		}

		if dead {
			#[cfg(LOGGING)]
			println!("{}: dead end at {:?}; backing up",
				self.iterations, self.map.pos(self.steps[top].cell));
			self.steps.pop();
			return if self.steps.is_empty() { Tick::Exhausted } else { Tick::Continuing }
		}

		let facing = self.steps[top].available.remove(0);
		let Some(cell) = self.map.resolve(self.steps[top].cell, facing) else {
			// Available facings always resolve; a violation means the
			// search state is beyond saving.
			self.steps.clear();
			return Tick::Exhausted
		};
		let step = Step::advance(self.map, &self.steps, top, cell, facing);
		self.steps.push(step);
		Tick::Continuing
	}

	/// Pop one step on demand, mirroring the automatic backtrack path.
	pub fn manual_backtrack(&mut self) -> Tick {
		self.steps.pop();
		if self.steps.is_empty() { Tick::Exhausted } else { Tick::Continuing }
	}

	fn exact_at(&mut self, idx: usize) -> bool {
		let step = &self.steps[idx];
		let ok = reach::exact_check(self.map, &step.filled, step.cell, &step.aliens, &step.empty_houses);
		self.steps[idx].exact_ok = Some(ok);
		ok
	}

	/// The fast tier's optimism let the search wander into a real dead end
	/// some steps ago. Once the exact check fails it keeps failing deeper
	/// (track only accumulates), so bisect between the last step it is
	/// known to have passed and the failing top for the earliest failure,
	/// and cut the stack back to just before it.
	fn rollback(&mut self, top: usize) -> Tick {
		self.rollbacks += 1;
		let known_good = self.steps.iter().rposition(|step| step.exact_ok == Some(true));
		let lo = match known_good {
			Some(idx) => idx,
			// No known-good step; if even the root fails, nothing was ever
			// reachable and the search is over.
			None if self.exact_at(0) => 0,
			None => {
				self.steps.clear();
				return Tick::Exhausted
			}
		};
		let (mut lo, mut hi) = (lo, top);
		while hi - lo > 1 {
			let mid = lo + (hi - lo) / 2;
			if self.exact_at(mid) { lo = mid } else { hi = mid }
		}
		let discarded = self.steps.len() - hi;
		self.steps.truncate(hi);
		// Failures are recurring; tighten the schedule in proportion to
		// how far the search overshot.
		self.exact_interval = self.exact_interval.min((discarded as u64 / 2).max(EXACT_INTERVAL_MIN));
		#[cfg(LOGGING)]
		println!("{}: exact check failed; discarded {} steps, checking every {}",
			self.iterations, discarded, self.exact_interval);
		Tick::Continuing
	}
}


#[cfg(test)]
mod tests {
	use crate::{map::GridMap, step::Car, Color};
	use super::{Solver, Tick};

	fn solve(solver: &mut Solver) -> Tick {
		for _ in 0..100_000 {
			match solver.tick() {
				Tick::Continuing => {}
				outcome => return outcome,
			}
		}
		panic!("no outcome after 100000 ticks")
	}

	#[test]
	fn solves_around_a_wall() {
		let map: GridMap = indoc::indoc! { "
			A..
			.#.
			..Z
		" }.parse().unwrap();
		let mut solver = Solver::new(&map);
		assert_eq!(solve(&mut solver), Tick::Won);
		// Five cells on the route: straight-ahead bias goes east first.
		assert_eq!(solver.depth(), 5);
		assert_eq!(solver.iterations(), 5);
		assert_eq!(solver.current_route(), indoc::indoc! { "
			>>v
			.#v
			..X
		" }.trim_end());
	}

	#[test]
	fn exhausts_a_walled_off_exit() {
		let map: GridMap = indoc::indoc! { "
			A#.
			##.
			..Z
		" }.parse().unwrap();
		assert_eq!(solve(&mut Solver::new(&map)), Tick::Exhausted);
	}

	#[test]
	fn delivers_a_green_alien() {
		let map: GridMap = indoc::indoc! { "
			A..Z
			G..g
		" }.parse().unwrap();
		let mut solver = Solver::new(&map);
		// The alien boards the moment the train appears next to it...
		assert_eq!(solver.steps[0].cars[0],
			Some(Car { occupant: Some(Color::Green), slimed: true }));
		assert_eq!(solve(&mut solver), Tick::Won);
		// ...and by the exit it has deboarded, leaving the slime behind.
		let last = solver.steps.last().unwrap();
		assert_eq!(last.cars[0], Some(Car { occupant: None, slimed: true }));
		assert!(last.aliens.is_empty() && last.empty_houses.is_empty());
	}

	#[test]
	fn fast_and_exact_tiers_agree_on_a_clean_solve() {
		let map: GridMap = indoc::indoc! { "
			A..Z
			G..g
		" }.parse().unwrap();
		let mut solver = Solver::new(&map);
		// Run the exact check on every step: it must never disagree with
		// the fast tier on a map without traps.
		solver.exact_interval = 1;
		assert_eq!(solve(&mut solver), Tick::Won);
		assert_eq!(solver.rollbacks(), 0);
	}

	#[test]
	fn exact_interval_grows_while_checks_pass() {
		let map: GridMap = indoc::indoc! { "
			A................Z
		" }.parse().unwrap();
		let mut solver = Solver::new(&map);
		assert_eq!(solve(&mut solver), Tick::Won);
		assert_eq!(solver.iterations(), 18);
		// One scheduled exact check passed along the way and doubled the
		// interval.
		assert_eq!(solver.exact_interval, 32);
	}

	#[test]
	fn rollback_bisects_to_the_earliest_failing_step() {
		// The alien's pocket hangs off the corridor by a single entrance,
		// so the exact check fails from the start, but the fast tier sees
		// a connected board and lets the search march on.
		let map: GridMap = indoc::indoc! { "
			A...........Z
			#####.#######
			###....######
			####G########
		" }.parse().unwrap();
		let mut solver = Solver::new(&map);
		solver.exact_interval = u64::MAX;
		for _ in 0..5 {
			assert_eq!(solver.tick(), Tick::Continuing);
		}
		assert_eq!(solver.depth(), 6);
		// Pretend an early step was vetted, then force a check: the
		// bisection should walk the failure back to right after it.
		solver.steps[1].exact_ok = Some(true);
		solver.exact_interval = 1;
		solver.since_exact = 0;
		assert_eq!(solver.tick(), Tick::Continuing);
		assert_eq!(solver.rollbacks(), 1);
		assert_eq!(solver.depth(), 2);
		// The interval tightened toward the floor.
		assert_eq!(solver.exact_interval, 1);
		// Nothing left to try below the truncation point.
		assert_eq!(solver.tick(), Tick::Continuing);
		assert_eq!(solver.tick(), Tick::Exhausted);
	}

	#[test]
	fn unsolvable_trap_exhausts_through_rollback() {
		let map: GridMap = indoc::indoc! { "
			A...........Z
			#####.#######
			###....######
			####G########
		" }.parse().unwrap();
		let mut solver = Solver::new(&map);
		solver.exact_interval = 4;
		assert_eq!(solve(&mut solver), Tick::Exhausted);
		assert!(solver.rollbacks() >= 1);
	}

	#[test]
	fn pause_and_manual_backtrack() {
		let map: GridMap = indoc::indoc! { "
			A.Z
		" }.parse().unwrap();
		let mut solver = Solver::new(&map);
		solver.pause();
		assert_eq!(solver.tick(), Tick::Continuing);
		assert_eq!(solver.iterations(), 0);
		assert_eq!(solver.depth(), 1);
		solver.resume();
		assert_eq!(solver.tick(), Tick::Continuing);
		assert_eq!(solver.depth(), 2);
		assert_eq!(solver.manual_backtrack(), Tick::Continuing);
		assert_eq!(solver.depth(), 1);
		assert_eq!(solver.manual_backtrack(), Tick::Exhausted);
		assert_eq!(solver.tick(), Tick::Exhausted);
	}
}
