//! Strongly-typed indices into the flat storage of a [`Topology`](crate::Topology).

use std::fmt;

macro_rules! idx {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

idx!(VertexId);
idx!(ArcId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_type_name() {
        assert_eq!(VertexId(3).to_string(), "VertexId(3)");
        assert_eq!(ArcId(0).to_string(), "ArcId(0)");
    }

    #[test]
    fn ordering_follows_index() {
        assert!(ArcId(1) < ArcId(2));
        assert!(VertexId(0) < VertexId(10));
    }
}
