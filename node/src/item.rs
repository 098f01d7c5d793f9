use kernel::{Item, ItemId};

/// Reference item representation: an opaque byte body whose id is carried
/// alongside it rather than derived, since the cryptographic item format and
/// its hashing scheme are out of scope for this node.
#[derive(Clone, Debug)]
pub struct OpaqueItem {
	pub id: ItemId,
	pub body: Vec<u8>,
}

impl Item for OpaqueItem {
	fn id(&self) -> ItemId {
		self.id
	}
}
