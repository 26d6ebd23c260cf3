use std::marker::PhantomData;

/// Hands out consecutive ids, starting at zero.
#[derive(Debug, Clone)]
pub struct IdGenerator<T: From<usize>> {
    next_id: usize,
    phantom: PhantomData<T>,
}

impl<T: From<usize>> IdGenerator<T> {
    pub fn gen(&mut self) -> T {
        let id = self.next_id;
        self.next_id += 1;
        T::from(id)
    }
}

impl<T: From<usize>> Default for IdGenerator<T> {
    fn default() -> IdGenerator<T> {
        IdGenerator {
            next_id: 0,
            phantom: PhantomData,
        }
    }
}

/// Mints names of form `<prefix><n>`, where `n` comes from one counter shared
/// by all prefixes: `select0`, `range1`, `count2`.
#[derive(Debug, Clone, Default)]
pub struct NameGenerator {
    id: IdGenerator<usize>,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gen(&mut self, prefix: &str) -> String {
        format!("{}{}", prefix, self.id.gen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_counter() {
        let mut names = NameGenerator::new();
        assert_eq!(names.gen("select"), "select0");
        assert_eq!(names.gen("range"), "range1");
        assert_eq!(names.gen("select"), "select2");
    }
}
