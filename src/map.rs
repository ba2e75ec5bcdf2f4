// Copyright (c) 2022 Bastiaan Marinus van de Weerd


/// Up to two trailing cars behind the front car.
pub const MAX_CARS: usize = 3;


/// Facing of the train head, doubling as a unit displacement on the grid.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing { North, East, South, West }

impl Facing {
	pub const ALL: [Facing; 4] = [Facing::North, Facing::East, Facing::South, Facing::West];

	pub fn delta(self) -> [isize; 2] {
		use Facing::*;
		match self { North => [0, -1], East => [1, 0], South => [0, 1], West => [-1, 0] }
	}

	fn next(self) -> Self {
		use Facing::*;
		match self { North => East, East => South, South => West, West => North }
	}

	pub fn inv(self) -> Self {
		self.next().next()
	}

	/// Dense 0..4 index, for per-facing tables.
	pub fn idx(self) -> usize {
		use Facing::*;
		match self { North => 0, East => 1, South => 2, West => 3 }
	}

	/// All four facings starting from `self` and rotating through the ring;
	/// the try-order when arriving along `self` (straight ahead first).
	pub fn rotation(self) -> impl Iterator<Item = Facing> {
		(0..4).scan(self, |f, _| { let cur = *f; *f = f.next(); Some(cur) })
	}
}


#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Color { Green, Orange, Purple }

/// Classified glyph of one map cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tile {
	Empty,
	Wall,
	/// Transparent to traversal; never a resting position.
	Crossing,
	/// One terminal of the teleport pair; traversal continues past the other.
	Warp,
	Exit,
	FrontCar,
	/// Marker adding one trailing car; inert on the board.
	ExtraCar,
	Alien(Color),
	/// `None` is the wildcard house, accepting any color.
	House(Option<Color>),
	/// Human route annotation, inert.
	Hint(u8),
}

impl Tile {
	fn try_from_glyph(glyph: u8) -> Option<Tile> {
		use {Color::*, Tile::*};
		Some(match glyph {
			b'.' => Empty,
			b'#' => Wall,
			b'+' => Crossing,
			b'*' => Warp,
			b'Z' => Exit,
			b'A' => FrontCar,
			b'a' => ExtraCar,
			b'G' => Alien(Green),
			b'O' => Alien(Orange),
			b'P' => Alien(Purple),
			b'g' => House(Some(Green)),
			b'o' => House(Some(Orange)),
			b'p' => House(Some(Purple)),
			b'?' => House(None),
			b'-' | b'L' | b'r' | b'|' | b'J' | b'7' => Hint(glyph),
			_ => return None,
		})
	}

	pub fn glyph(self) -> u8 {
		use {Color::*, Tile::*};
		match self {
			Empty => b'.',
			Wall => b'#',
			Crossing => b'+',
			Warp => b'*',
			Exit => b'Z',
			FrontCar => b'A',
			ExtraCar => b'a',
			Alien(Green) => b'G',
			Alien(Orange) => b'O',
			Alien(Purple) => b'P',
			House(Some(Green)) => b'g',
			House(Some(Orange)) => b'o',
			House(Some(Purple)) => b'p',
			House(None) => b'?',
			Hint(glyph) => glyph,
		}
	}

	/// Whether the train may rest here. Distinct from what traversal can
	/// see through: crossings resolve past, and warps teleport, so neither
	/// ever comes out of the resolver as a landing cell.
	pub fn is_navigable(self) -> bool {
		matches!(self, Tile::Empty | Tile::Exit | Tile::Warp | Tile::FrontCar)
	}
}


/// Immutable parsed puzzle. Cells are dense `y * width + x` indices into
/// preallocated tables; the crossing/warp-resolving next-cell table and the
/// navigable-adjacency lists are built once here, since the map never
/// changes after parsing.
#[derive(Debug)]
pub struct GridMap {
	pub width: usize,
	pub height: usize,
	tiles: Vec<Tile>,
	/// Per (cell, facing index): the effective landing cell one move away,
	/// after resolving past crossings and through warps; `None` off the map.
	resolved: Vec<[Option<usize>; 4]>,
	/// Per cell: resolved neighbors with navigable tiles, in facing order.
	/// Restricted to navigable cells this is the adjacency graph the
	/// reachability checks run on.
	nav_neighbors: Vec<Vec<usize>>,
	/// Cells the train may rest on: empty cells, the start, and the exit.
	pub navigable: Vec<usize>,
	pub aliens: Vec<usize>,
	pub houses: Vec<usize>,
	pub hints: Vec<usize>,
	pub start: usize,
	pub exit: usize,
	pub warps: Option<[usize; 2]>,
	pub num_cars: usize,
}

impl GridMap {
	pub fn tile(&self, cell: usize) -> Tile {
		self.tiles[cell]
	}

	pub fn cell(&self, x: usize, y: usize) -> usize {
		y * self.width + x
	}

	pub fn pos(&self, cell: usize) -> [usize; 2] {
		[cell % self.width, cell / self.width]
	}

	/// The effective cell one move from `cell` in `facing`, skipping past
	/// crossings and jumping through the warp pair; `None` off the map.
	pub fn resolve(&self, cell: usize, facing: Facing) -> Option<usize> {
		self.resolved[cell][facing.idx()]
	}

	pub fn nav_neighbors(&self, cell: usize) -> &[usize] {
		&self.nav_neighbors[cell]
	}

	/// The raw glyph of every cell, row-major; the seed of a route display.
	pub fn glyphs(&self) -> Vec<u8> {
		self.tiles.iter().map(|tile| tile.glyph()).collect()
	}
}

fn resolve_step(
	tiles: &[Tile],
	width: usize,
	height: usize,
	warps: Option<[usize; 2]>,
	from: usize,
	facing: Facing,
) -> Option<usize> {
	let [dx, dy] = facing.delta();
	let mut x = (from % width) as isize;
	let mut y = (from / width) as isize;
	// A crossing/warp chain can't be longer than the board; a cycle (two
	// warps feeding each other) resolves to nowhere instead of hanging.
	for _ in 0..=width * height {
		x += dx;
		y += dy;
		if x < 0 || y < 0 || x >= width as isize || y >= height as isize { return None }
		let cell = y as usize * width + x as usize;
		match tiles[cell] {
			Tile::Crossing => {}
			Tile::Warp => {
				let [w0, w1] = warps?;
				let dest = if cell == w0 { w1 } else { w0 };
				x = (dest % width) as isize;
				y = (dest / width) as isize;
			}
			_ => return Some(cell),
		}
	}
	None
}


pub mod parsing {
	use std::str::FromStr;
	use super::{resolve_step, Facing, GridMap, Tile, MAX_CARS};

	#[derive(thiserror::Error, Clone, PartialEq, Eq, Debug)]
	pub enum MapError {
		#[error("line {line} is {len} glyphs wide, expected {width}")]
		Format { line: usize, width: usize, len: usize },
		#[error("unknown glyph {found:?} at line {line}, column {column}")]
		Glyph { line: usize, column: usize, found: char },
		#[error("duplicate {glyph:?} at line {line}, column {column}")]
		Duplicate { line: usize, column: usize, glyph: char },
		#[error("map implies {count} cars; at most {MAX_CARS} are supported")]
		TooManyCars { count: usize },
		#[error("{count} warp terminals; exactly one pair is supported")]
		WarpPair { count: usize },
		#[error("no front-car start glyph")]
		NoStart,
		#[error("no exit glyph")]
		NoExit,
	}

	impl FromStr for GridMap {
		type Err = MapError;
		fn from_str(s: &str) -> Result<Self, Self::Err> {
			use MapError::*;

			// Tolerate a dangling newline at the end of a map file.
			let s = s.strip_suffix('\n').unwrap_or(s);

			let mut tiles = Vec::with_capacity(s.len());
			let mut width = None;
			let mut start = None;
			let mut exit = None;
			let mut warp_cells = Vec::new();
			let mut navigable = Vec::new();
			let mut aliens = Vec::new();
			let mut houses = Vec::new();
			let mut hints = Vec::new();
			let mut num_cars = 1;

			for (l, line) in s.lines().enumerate() {
				let len = line.chars().count();
				if len == 0 || len != *width.get_or_insert(len) {
					return Err(Format { line: l + 1, width: width.unwrap_or(0), len });
				}
				for (c, chr) in line.chars().enumerate() {
					let cell = tiles.len();
					let tile = u8::try_from(chr).ok()
						.and_then(Tile::try_from_glyph)
						.ok_or(Glyph { line: l + 1, column: c + 1, found: chr })?;
					match tile {
						Tile::Empty => navigable.push(cell),
						Tile::Exit => {
							if exit.replace(cell).is_some() {
								return Err(Duplicate { line: l + 1, column: c + 1, glyph: 'Z' });
							}
							// The exit is a navigable cell in its own right.
							navigable.push(cell);
						}
						Tile::FrontCar => {
							if start.replace(cell).is_some() {
								return Err(Duplicate { line: l + 1, column: c + 1, glyph: 'A' });
							}
							navigable.push(cell);
						}
						Tile::ExtraCar => {
							num_cars += 1;
							if num_cars > MAX_CARS {
								return Err(TooManyCars { count: num_cars });
							}
						}
						Tile::Warp => warp_cells.push(cell),
						Tile::Alien(_) => aliens.push(cell),
						Tile::House(_) => houses.push(cell),
						Tile::Hint(_) => hints.push(cell),
						Tile::Wall | Tile::Crossing => {}
					}
					tiles.push(tile);
				}
			}

			let width = width.ok_or(NoStart)?;
			let height = tiles.len() / width;
			let start = start.ok_or(NoStart)?;
			let exit = exit.ok_or(NoExit)?;
			let warps = match warp_cells[..] {
				[] => None,
				[w0, w1] => Some([w0, w1]),
				_ => return Err(WarpPair { count: warp_cells.len() }),
			};

			let resolved = (0..tiles.len())
				.map(|cell| {
					let mut by_facing = [None; 4];
					for facing in Facing::ALL {
						by_facing[facing.idx()] =
							resolve_step(&tiles, width, height, warps, cell, facing);
					}
					by_facing
				})
				.collect::<Vec<_>>();
			let nav_neighbors = resolved.iter()
				.map(|by_facing| Facing::ALL.into_iter()
					.filter_map(|facing| by_facing[facing.idx()])
					.filter(|&cell| tiles[cell].is_navigable())
					.collect())
				.collect();

			Ok(GridMap {
				width, height, tiles, resolved, nav_neighbors,
				navigable, aliens, houses, hints,
				start, exit, warps, num_cars,
			})
		}
	}
}
