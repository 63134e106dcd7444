use std::fmt::{self, Write};

#[derive(Clone, Copy)]
enum Segment<'p> {
    Root,
    Field(&'p str),
    Index(usize),
    Key(&'p dyn fmt::Debug),
}

/// Where the engine is in the value tree. Lives on the stack and is only
/// rendered, as `$.items[3]["k"]`, when an error is raised.
#[derive(Clone, Copy)]
pub(crate) struct Path<'p> {
    parent:  Option<&'p Path<'p>>,
    segment: Segment<'p>,
}

impl Path<'static> {
    pub fn root() -> Path<'static> {
        Path {
            parent:  None,
            segment: Segment::Root,
        }
    }
}

impl<'p> Path<'p> {
    pub fn field<'q>(&'q self, name: &'q str) -> Path<'q> {
        Path {
            parent:  Some(self),
            segment: Segment::Field(name),
        }
    }

    pub fn index(&self, index: usize) -> Path<'_> {
        Path {
            parent:  Some(self),
            segment: Segment::Index(index),
        }
    }

    pub fn key<'q>(&'q self, key: &'q dyn fmt::Debug) -> Path<'q> {
        Path {
            parent:  Some(self),
            segment: Segment::Key(key),
        }
    }

    pub fn render(&self) -> String {
        let mut segments = Vec::new();
        let mut cursor = Some(self);
        while let Some(path) = cursor {
            segments.push(path.segment);
            cursor = path.parent;
        }

        let mut out = String::from("$");
        for segment in segments.iter().rev() {
            let _ = match segment {
                Segment::Root => Ok(()),
                Segment::Field(name) => write!(out, ".{}", name),
                Segment::Index(index) => write!(out, "[{}]", index),
                Segment::Key(key) => write!(out, "[{:?}]", key),
            };
        }
        out
    }
}
