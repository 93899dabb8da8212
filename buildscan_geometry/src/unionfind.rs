//! A disjoint-set forest with path compression and union-by-rank.

pub struct UnionFind {
	parent: Vec<usize>,
	rank: Vec<u8>,
}

impl UnionFind {
	pub fn new(n: usize) -> UnionFind {
		UnionFind { parent: (0..n).collect(), rank: vec![0; n] }
	}

	pub fn find(&mut self, i: usize) -> usize {
		if self.parent[i] != i {
			self.parent[i] = self.find(self.parent[i]);
		}
		self.parent[i]
	}

	pub fn union(&mut self, a: usize, b: usize) {
		let ra = self.find(a);
		let rb = self.find(b);
		if ra == rb {
			return;
		}
		match self.rank[ra].cmp(&self.rank[rb]) {
			std::cmp::Ordering::Less => self.parent[ra] = rb,
			std::cmp::Ordering::Greater => self.parent[rb] = ra,
			std::cmp::Ordering::Equal => {
				self.parent[rb] = ra;
				self.rank[ra] += 1;
			}
		}
	}

	/// Groups `0..n` by their root, in root-discovery order.
	pub fn components(&mut self) -> Vec<Vec<usize>> {
		let n = self.parent.len();
		let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
		for i in 0..n {
			let root = self.find(i);
			match groups.iter_mut().find(|(r, _)| *r == root) {
				Some((_, members)) => members.push(i),
				None => groups.push((root, vec![i])),
			}
		}
		groups.into_iter().map(|(_, members)| members).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn transitive_union_collapses_chain() {
		let mut uf = UnionFind::new(4);
		uf.union(0, 1);
		uf.union(1, 2);
		assert_eq!(uf.find(0), uf.find(2));
		assert_ne!(uf.find(0), uf.find(3));
	}

	#[test]
	fn components_partition_all_elements() {
		let mut uf = UnionFind::new(5);
		uf.union(0, 1);
		uf.union(3, 4);
		let comps = uf.components();
		let total: usize = comps.iter().map(|c| c.len()).sum();
		assert_eq!(total, 5);
		assert_eq!(comps.len(), 3);
	}
}
