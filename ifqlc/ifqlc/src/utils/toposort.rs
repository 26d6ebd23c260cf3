use std::collections::HashMap;
use std::hash::Hash;

type Dag = Vec<Vec<usize>>;

struct Toposort {
    nodes: Vec<Node>,
    order: Vec<usize>,
}

#[derive(Clone, Copy)]
struct Node {
    visiting: bool,
    done: bool,
}

/// Orders keys so that each key comes after all of its dependencies. Keys
/// that don't depend on each other keep their relative order.
///
/// Dependencies on keys that are not in the list are ignored. Returns `None`
/// when the dependencies contain a cycle.
pub fn toposort<Key: Eq + Hash>(dependencies: &[(Key, Vec<Key>)]) -> Option<Vec<&Key>> {
    // create mapping from Key to usize
    let index: HashMap<&Key, usize> = dependencies
        .iter()
        .enumerate()
        .map(|(index, (key, _))| (key, index))
        .collect();

    // map DAG from Key to usize
    let dag: Dag = dependencies
        .iter()
        .map(|(_, deps)| deps.iter().flat_map(|d| index.get(d).cloned()).collect())
        .collect();

    let empty = Node {
        visiting: false,
        done: false,
    };
    let mut toposort = Toposort {
        nodes: vec![empty; dependencies.len()],
        order: Vec::with_capacity(dependencies.len()),
    };

    for start_at in 0..dependencies.len() {
        toposort.visit(&dag, start_at).ok()?;
    }

    Some(toposort.order.iter().map(|i| &dependencies[*i].0).collect())
}

impl Toposort {
    fn visit(&mut self, dag: &Dag, n: usize) -> Result<(), ()> {
        let node = self.nodes[n];
        if node.done {
            return Ok(());
        }
        if node.visiting {
            return Err(());
        }
        self.nodes[n].visiting = true;

        for m in &dag[n] {
            self.visit(dag, *m)?;
        }

        self.nodes[n] = Node {
            visiting: false,
            done: true,
        };
        self.order.push(n);

        Ok(())
    }
}
