// Copyright (c) 2022 Bastiaan Marinus van de Weerd

use crate::map::{Color, Facing, GridMap, Tile, MAX_CARS};


/// One car of the train.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct Car {
	pub occupant: Option<Color>,
	/// Sticky: once a green alien has ridden in a car it never comes clean.
	pub slimed: bool,
}


/// Dense set of cell ids, sized to the map.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CellSet {
	words: Box<[u64]>,
	len: usize,
}

impl CellSet {
	pub fn new(cells: usize) -> Self {
		CellSet { words: vec![0; (cells + 63) / 64].into_boxed_slice(), len: 0 }
	}

	pub fn insert(&mut self, cell: usize) -> bool {
		let (word, bit) = (cell / 64, 1u64 << (cell % 64));
		let inserted = self.words[word] & bit == 0;
		self.words[word] |= bit;
		self.len += inserted as usize;
		inserted
	}

	pub fn contains(&self, cell: usize) -> bool {
		self.words[cell / 64] & 1 << (cell % 64) != 0
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}
}


/// Glyphs drawn over the map as the route progresses.
const DRAW_HEAD: u8 = b'X';
const DRAW_FILLED_HOUSE: u8 = b'@';
const DRAW_BOARDED_ALIEN: u8 = b'_';
/// Laid track, indexed by `Facing::idx`.
const DRAW_TRACK: [u8; 4] = [b'^', b'>', b'v', b'<'];

/// Render state of the board, one glyph byte per cell. This is the
/// authoritative draw state, copied per step; it only becomes a string at
/// the host boundary.
#[derive(Clone, Debug)]
pub struct RouteBuffer {
	glyphs: Box<[u8]>,
	width: usize,
}

impl RouteBuffer {
	fn of_map(map: &GridMap) -> Self {
		RouteBuffer { glyphs: map.glyphs().into_boxed_slice(), width: map.width }
	}

	fn draw(&mut self, cell: usize, glyph: u8) {
		self.glyphs[cell] = glyph;
	}

	pub fn render(&self) -> String {
		use itertools::Itertools as _;
		self.glyphs.chunks(self.width)
			.map(|row| row.iter().map(|&glyph| glyph as char).collect::<String>())
			.join("\n")
	}
}


/// One node of the search tree: the frozen world state after laying one
/// tile of track. Parents are handles (indices) into the solver's step
/// vector, so history is shared without ownership cycles.
#[derive(Clone, Debug)]
pub struct Step {
	pub cell: usize,
	pub parent: Option<usize>,
	pub arrived: Facing,
	/// `None` while a trailing car hasn't come onto the board yet; car `i`
	/// trails the head by `i` steps.
	pub cars: [Option<Car>; MAX_CARS],
	/// Remaining (not yet boarded) alien cells.
	pub aliens: Vec<usize>,
	/// Remaining unfilled house cells.
	pub empty_houses: Vec<usize>,
	/// Cells already laid with track, exactly the parent chain's cells.
	pub filled: CellSet,
	/// Step handles since a passenger last boarded or deboarded.
	pub quiet_run: Vec<usize>,
	/// Facings not yet tried from this cell, best first.
	pub available: Vec<Facing>,
	pub passenger_change: bool,
	/// Cached verdict of the exact reachability check, once it has run here.
	pub exact_ok: Option<bool>,
	pub route: RouteBuffer,
}

impl Step {
	pub fn root(map: &GridMap) -> Self {
		let mut cars = [None; MAX_CARS];
		cars[0] = Some(Car::default());
		let mut route = RouteBuffer::of_map(map);
		route.draw(map.start, DRAW_HEAD);
		let mut step = Step {
			cell: map.start,
			parent: None,
			arrived: Facing::West,
			cars,
			aliens: map.aliens.clone(),
			empty_houses: map.houses.clone(),
			filled: CellSet::new(map.width * map.height),
			quiet_run: Vec::new(),
			available: Vec::new(),
			passenger_change: false,
			exact_ok: None,
			route,
		};
		step.available = step.available_facings(map);
		step.transfer_passengers(map, &[]);
		step
	}

	/// The step after laying track from `steps[parent]`'s cell along
	/// `facing` to the (already resolved) landing `cell`.
	pub fn advance(map: &GridMap, steps: &[Step], parent: usize, cell: usize, facing: Facing) -> Self {
		let prev = &steps[parent];
		let mut filled = prev.filled.clone();
		filled.insert(prev.cell);
		let mut route = prev.route.clone();
		route.draw(prev.cell, DRAW_TRACK[facing.idx()]);
		route.draw(cell, DRAW_HEAD);
		let mut quiet_run = prev.quiet_run.clone();
		quiet_run.push(parent);
		let mut step = Step {
			cell,
			parent: Some(parent),
			arrived: facing,
			cars: prev.cars,
			aliens: prev.aliens.clone(),
			empty_houses: prev.empty_houses.clone(),
			filled,
			quiet_run,
			available: Vec::new(),
			passenger_change: false,
			exact_ok: None,
			route,
		};
		step.available = step.available_facings(map);
		step.transfer_passengers(map, steps);
		if step.passenger_change {
			step.quiet_run = Vec::new();
		}
		step
	}

	/// Facings in rotation order from the arrival facing, keeping only
	/// those resolving to a navigable, unfilled cell. Straight-ahead first
	/// biases the search toward straight track.
	fn available_facings(&self, map: &GridMap) -> Vec<Facing> {
		self.arrived.rotation()
			.filter(|&facing| map.resolve(self.cell, facing)
				.map_or(false, |cell| map.tile(cell).is_navigable() && !self.filled.contains(cell)))
			.collect()
	}

	/// The cell car `car` sits on: `car` steps back up the parent chain,
	/// or `None` while the train is still too short for it.
	fn car_cell(&self, steps: &[Step], car: usize) -> Option<usize> {
		let mut cell = self.cell;
		let mut parent = self.parent;
		for _ in 0..car {
			let up = parent?;
			cell = steps[up].cell;
			parent = steps[up].parent;
		}
		Some(cell)
	}

	/// Deboard, then board, each car front to back. Deboarding first lets
	/// one alien leave a car and another take its place in the same step.
	fn transfer_passengers(&mut self, map: &GridMap, steps: &[Step]) {
		for i in 0..map.num_cars {
			let Some(car_cell) = self.car_cell(steps, i) else { continue };
			let mut car = self.cars[i].unwrap_or_default();

			if let Some(color) = car.occupant {
				for facing in Facing::ALL {
					let Some(cell) = map.resolve(car_cell, facing) else { continue };
					let Some(house) = self.empty_houses.iter().position(|&h| h == cell) else { continue };
					let Tile::House(kind) = map.tile(cell) else { continue };
					if kind.map_or(true, |k| k == color) {
						self.passenger_change = true;
						car.occupant = None;
						self.empty_houses.remove(house);
						self.route.draw(cell, DRAW_FILLED_HOUSE);
						// One alien per house.
						break;
					}
				}
			}

			if car.occupant.is_none() {
				for facing in Facing::ALL {
					let Some(cell) = map.resolve(car_cell, facing) else { continue };
					let Some(alien) = self.aliens.iter().position(|&a| a == cell) else { continue };
					let Tile::Alien(color) = map.tile(cell) else { continue };
					let boarded = match color {
						// A green alien always gets in, and slimes the car.
						Color::Green => {
							car.slimed = true;
							true
						}
						// Orange & purple refuse a slimed car.
						_ => !car.slimed,
					};
					if boarded {
						self.passenger_change = true;
						car.occupant = Some(color);
						self.aliens.remove(alien);
						self.route.draw(cell, DRAW_BOARDED_ALIEN);
						// One alien per car.
						break;
					}
				}
			}

			self.cars[i] = Some(car);
		}
	}

	pub fn is_win(&self, map: &GridMap) -> bool {
		self.cell == map.exit && self.aliens.is_empty() && self.empty_houses.is_empty()
	}

	/// The path has doubled back next to its own recent, passenger-neutral
	/// history; an equivalent shorter path reaches the same state, so this
	/// one can be cut.
	pub fn is_redundant_path(&self, map: &GridMap, steps: &[Step]) -> bool {
		self.quiet_run.iter().any(|&old| Some(old) != self.parent
			&& map.nav_neighbors(self.cell).contains(&steps[old].cell))
	}

	pub fn is_dead_end(&self, map: &GridMap, steps: &[Step]) -> bool {
		self.available.is_empty()
			|| self.is_redundant_path(map, steps)
			|| !self.vital_cells_reachable(map, steps)
			// Stepping onto the exit before the win is disqualifying: the
			// train can't leave and come back.
			|| self.cell == map.exit
	}

	/// Fast tier of dead-end detection. Checked against the parent's
	/// filled cells, one turn behind, so trailing cars get a turn of grace
	/// to clear a cell before the guarantee is demanded.
	fn vital_cells_reachable(&self, map: &GridMap, steps: &[Step]) -> bool {
		let Some(parent) = self.parent else { return true };
		let prev = &steps[parent];
		crate::reach::fast_check(map, &prev.filled, prev.cell, &self.aliens, &self.empty_houses)
	}
}


#[cfg(test)]
mod tests {
	use crate::map::{Color, Facing, GridMap};
	use super::{Car, CellSet, Step};

	fn advance(map: &GridMap, steps: &mut Vec<Step>, facing: Facing) {
		let parent = steps.len() - 1;
		let cell = map.resolve(steps[parent].cell, facing).unwrap();
		let step = Step::advance(map, steps, parent, cell, facing);
		steps.push(step);
	}

	#[test]
	fn cell_set() {
		let mut set = CellSet::new(100);
		assert!(set.is_empty());
		assert!(set.insert(70));
		assert!(!set.insert(70));
		assert!(set.insert(0));
		assert!(set.contains(70) && set.contains(0) && !set.contains(71));
		assert_eq!(set.len(), 2);
	}

	#[test]
	fn rotation_priority() {
		let map: GridMap = indoc::indoc! { "
			.....
			.....
			A...Z
			.....
			.....
		" }.parse().unwrap();
		let mut steps = vec![Step::root(&map)];
		// Arriving west (the root default), the rotation is W, N, E, S.
		use Facing::*;
		assert_eq!(steps[0].available, vec![North, East, South]);
		advance(&map, &mut steps, East);
		// Arriving east: E, S, W, N, with the filled parent cell dropped.
		assert_eq!(steps[1].available, vec![East, South, North]);
	}

	#[test]
	fn filled_cells_track_the_parent_chain() {
		let map: GridMap = indoc::indoc! { "
			....
			A..Z
			....
		" }.parse().unwrap();
		let mut steps = vec![Step::root(&map)];
		advance(&map, &mut steps, Facing::East);
		advance(&map, &mut steps, Facing::East);
		advance(&map, &mut steps, Facing::North);
		for (i, step) in steps.iter().enumerate() {
			assert_eq!(step.filled.len(), i);
			assert!(!step.filled.contains(step.cell));
		}
		assert!(steps[3].filled.contains(map.cell(0, 1)));
		assert!(steps[3].filled.contains(map.cell(1, 1)));
		assert!(steps[3].filled.contains(map.cell(2, 1)));
	}

	#[test]
	fn boarding_and_sliming() {
		let map: GridMap = indoc::indoc! { "
			A...Z
			GP...
			a####
		" }.parse().unwrap();
		assert_eq!(map.num_cars, 2);
		let mut steps = vec![Step::root(&map)];
		// The green alien below the start boards the front car immediately.
		assert_eq!(steps[0].cars[0], Some(Car { occupant: Some(Color::Green), slimed: true }));
		assert_eq!(steps[0].cars[1], None);
		assert!(steps[0].passenger_change);
		// One step in, the trailing car appears on the start cell.
		advance(&map, &mut steps, Facing::East);
		assert_eq!(steps[1].cars[1], Some(Car::default()));
		assert!(!steps[1].passenger_change);
		// Another step, and the purple alien boards the trailing car as it
		// passes; the slimed front car couldn't have taken it anyway.
		advance(&map, &mut steps, Facing::East);
		assert_eq!(steps[2].cars[0], Some(Car { occupant: Some(Color::Green), slimed: true }));
		assert_eq!(steps[2].cars[1], Some(Car { occupant: Some(Color::Purple), slimed: false }));
		assert!(steps[2].aliens.is_empty());
	}

	#[test]
	fn deboarding_precedes_boarding() {
		let map: GridMap = indoc::indoc! { "
			AG.Z
			.?..
			G...
		" }.parse().unwrap();
		let mut steps = vec![Step::root(&map)];
		assert_eq!(steps[0].cars[0], Some(Car { occupant: Some(Color::Green), slimed: true }));
		// Stepping south puts the car between the wildcard house and the
		// second green alien: it empties into the house, then the second
		// alien takes the vacated seat in the same step.
		advance(&map, &mut steps, Facing::South);
		let step = &steps[1];
		assert!(step.passenger_change);
		assert!(step.empty_houses.is_empty());
		assert!(step.aliens.is_empty());
		assert_eq!(step.cars[0], Some(Car { occupant: Some(Color::Green), slimed: true }));
		assert!(step.quiet_run.is_empty());
	}

	#[test]
	fn slimed_car_refuses_orange() {
		let map: GridMap = indoc::indoc! { "
			AG.Z
			.g..
			O...
		" }.parse().unwrap();
		let mut steps = vec![Step::root(&map)];
		advance(&map, &mut steps, Facing::South);
		let step = &steps[1];
		// The green passenger deboards into its house, but the orange alien
		// won't board the slimed car.
		assert!(step.empty_houses.is_empty());
		assert_eq!(step.aliens, vec![map.cell(0, 2)]);
		assert_eq!(step.cars[0], Some(Car { occupant: None, slimed: true }));
	}

	#[test]
	fn redundant_path_detection() {
		let map: GridMap = indoc::indoc! { "
			A..
			...
			..Z
		" }.parse().unwrap();
		let mut steps = vec![Step::root(&map)];
		advance(&map, &mut steps, Facing::East);
		advance(&map, &mut steps, Facing::South);
		assert!(!steps.last().unwrap().is_redundant_path(&map, &steps));
		// Curling back alongside the start without any passenger change.
		advance(&map, &mut steps, Facing::West);
		assert!(steps.last().unwrap().is_redundant_path(&map, &steps));
	}
}
