use std::cell::RefCell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trellis_core::{ComponentFn, Element, Node, Props, Reconciler, StateSetter};

const CHILD_COUNT_SAMPLES: &[usize] = &[16, 64, 256];

fn keyed_row(index: usize) -> Node {
    Element::host(
        "row",
        Props::new().with("label", format!("row {index}")),
        Node::Empty,
    )
    .keyed(index)
    .into()
}

fn row_list(count: usize, rotation: usize) -> Node {
    Node::Fragment(
        (0..count)
            .map(|offset| keyed_row((offset + rotation) % count))
            .collect(),
    )
}

struct ListFixture {
    reconciler: Reconciler,
    setter: StateSetter<usize>,
    rotation: usize,
}

impl ListFixture {
    /// Mount a component that renders `count` keyed rows rotated by its
    /// state value, and settle the initial render.
    fn new(count: usize) -> Self {
        let slot: Rc<RefCell<Option<StateSetter<usize>>>> = Rc::new(RefCell::new(None));
        let captured = slot.clone();
        let list: ComponentFn = Rc::new(move |_, _, hooks| {
            let (rotation, set_rotation) = hooks.use_state(|| 0usize);
            captured.borrow_mut().replace(set_rotation);
            Ok(row_list(count, rotation))
        });

        let mut reconciler = Reconciler::new();
        reconciler.mount(Element::component(list, Props::new(), Node::Empty).into());
        reconciler.work_to_completion();

        let setter = slot
            .borrow()
            .clone()
            .expect("component rendered during mount");
        Self {
            reconciler,
            setter,
            rotation: 0,
        }
    }

    /// One keyed reorder pass: every row moves, none is created or
    /// removed.
    fn rotate(&mut self) {
        self.rotation += 1;
        self.setter.set(self.rotation);
        self.reconciler.work_to_completion();
    }
}

fn bench_mount(c: &mut Criterion) {
    let mut group = c.benchmark_group("mount");
    for &count in CHILD_COUNT_SAMPLES {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut reconciler = Reconciler::new();
                reconciler.mount(row_list(count, 0));
                reconciler.work_to_completion();
                black_box(reconciler.tree().len())
            });
        });
    }
    group.finish();
}

fn bench_keyed_rotate(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_rotate");
    for &count in CHILD_COUNT_SAMPLES {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut fixture = ListFixture::new(count);
            b.iter(|| {
                fixture.rotate();
                black_box(fixture.reconciler.tree().len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_mount, bench_keyed_rotate);
criterion_main!(benches);
