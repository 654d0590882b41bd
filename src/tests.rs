use core::{any::TypeId, cell::Cell, mem::size_of, ptr};

use alloc::{boxed::Box, rc::Rc, string::String, vec, vec::Vec};

use crate::{
    any_cast, any_cast_mut, capability, is, BasicErased, Erased, MutInvoker, Ref, RefInvoker,
    RefMut, Table, DEFAULT_CAPACITY, DEFAULT_SIZE,
};

trait Shape {
    fn area(&mut self) -> f64;
    fn circumference(&self) -> f64;
}

#[derive(Clone, Debug, PartialEq)]
struct Circle {
    radius: f64,
}

impl Circle {
    fn new(radius: f64) -> Self {
        Circle { radius }
    }
}

impl From<f64> for Circle {
    fn from(radius: f64) -> Self {
        Circle { radius }
    }
}

impl Shape for Circle {
    fn area(&mut self) -> f64 {
        self.radius * self.radius * 3.14
    }

    fn circumference(&self) -> f64 {
        self.radius * 6.28
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Rectangle {
    a: f64,
    b: f64,
}

impl Rectangle {
    fn new(a: f64, b: f64) -> Self {
        Rectangle { a, b }
    }
}

impl Default for Rectangle {
    fn default() -> Self {
        Rectangle { a: 1.0, b: 1.0 }
    }
}

impl From<(f64, f64)> for Rectangle {
    fn from((a, b): (f64, f64)) -> Self {
        Rectangle { a, b }
    }
}

impl Shape for Rectangle {
    fn area(&mut self) -> f64 {
        self.a * self.b
    }

    fn circumference(&self) -> f64 {
        2.0 * (self.a + self.b)
    }
}

#[derive(Clone)]
struct BigRectangle {
    padding: [u8; 100],
    inner: Rectangle,
}

impl Shape for BigRectangle {
    fn area(&mut self) -> f64 {
        self.inner.area()
    }

    fn circumference(&self) -> f64 {
        self.inner.circumference() + self.padding[0] as f64
    }
}

crate::behavior! {
    ComputeArea as ComputeAreaExt: fn compute_area(&mut self) -> f64;
}

crate::behavior! {
    Perimeter as PerimeterExt: fn perimeter(&self) -> f64;
}

impl<T: Shape> MutInvoker<T> for ComputeArea {
    fn invoke(this: &mut T, (): ()) -> f64 {
        this.area()
    }
}

impl<T: Shape> RefInvoker<T> for Perimeter {
    fn invoke(this: &T, (): ()) -> f64 {
        this.circumference()
    }
}

type Surface = Erased<(ComputeArea, Perimeter, capability::Copy, capability::Move)>;
type MoveOnlySurface = Erased<(ComputeArea, Perimeter, capability::Move)>;
type OnlySurface = Erased<(ComputeArea, Perimeter)>;
type SurfaceRef<'a> = Ref<'a, (Perimeter,)>;
type SurfaceMut<'a> = RefMut<'a, (ComputeArea, Perimeter)>;

fn simple_computation(mut x: Surface) -> f64 {
    x.perimeter() + x.compute_area()
}

#[test]
fn test_computation() {
    assert_eq!(
        simple_computation(Surface::new(Circle::new(2.0))),
        Circle::new(2.0).area() + Circle::new(2.0).circumference()
    );

    assert_eq!(
        simple_computation(Surface::new(Rectangle::new(3.0, 1.0))),
        Rectangle::new(3.0, 1.0).area() + Rectangle::new(3.0, 1.0).circumference()
    );

    assert_eq!(
        simple_computation(Surface::new(Circle::new(2.0))),
        6.28 * 2.0 + 3.14 * 2.0 * 2.0
    );
}

#[test]
fn test_invoke_by_tag() {
    let mut x = OnlySurface::new(Rectangle::new(2.0, 3.0));

    assert_eq!(x.invoke(Perimeter, ()), 10.0);
    assert_eq!(x.invoke_mut(Perimeter, ()), 10.0);
    assert_eq!(x.invoke_mut(ComputeArea, ()), 6.0);
}

#[test]
fn test_fixed_size() {
    assert_eq!(size_of::<Surface>(), 32);
    assert_eq!(size_of::<OnlySurface>(), 32);
    assert_eq!(size_of::<Erased<()>>(), DEFAULT_SIZE);
    assert_eq!(Surface::SIZE, DEFAULT_SIZE);
    assert_eq!(Surface::CAPACITY, DEFAULT_CAPACITY);
    assert_eq!(DEFAULT_CAPACITY, 24);
}

#[test]
#[cfg(target_pointer_width = "64")]
fn test_custom_size() {
    assert_eq!(size_of::<BasicErased<(), 56>>(), 64);
}

#[test]
fn test_reassign() {
    let mut x = Surface::new(Circle::default_radius());
    assert!(x.is::<Circle>());

    x = Surface::new(Rectangle::default());

    assert_eq!(simple_computation(x), 1.0 + 4.0);
}

impl Circle {
    fn default_radius() -> Self {
        Circle { radius: 1.0 }
    }
}

#[test]
fn test_copy() {
    let mut x = Surface::new(Circle::new(5.0));
    let y = x.clone();
    let z = Surface::new(Rectangle::new(10.0, 1.0));
    x.clone_from(&z);

    assert_eq!(
        simple_computation(y) + simple_computation(x),
        (Circle::new(5.0).circumference() + Circle::new(5.0).area())
            + (Rectangle::new(10.0, 1.0).circumference() + Rectangle::new(10.0, 1.0).area())
    );

    // Source is untouched.
    assert_eq!(z.downcast_ref::<Rectangle>(), Some(&Rectangle::new(10.0, 1.0)));
}

#[test]
fn test_copy_independent() {
    let mut x = Surface::new(Circle::new(1.0));
    let y = x.clone();

    x.downcast_mut::<Circle>().unwrap().radius = 3.0;
    assert_eq!(y.downcast_ref::<Circle>(), Some(&Circle::new(1.0)));

    x = Surface::new(Rectangle::default());
    assert!(x.is::<Rectangle>());
    assert_eq!(y.perimeter(), 6.28);
}

#[test]
fn test_copy_heap() {
    let x: Erased<(capability::Copy,)> = Erased::new(vec![1u64, 2, 3, 4, 5]);
    let big: Erased<(capability::Copy,)> = Erased::new([7u64; 16]);
    assert!(!big.is_inline());

    let y = x.clone();
    let z = big.clone();

    assert_eq!(y.downcast_ref::<Vec<u64>>(), Some(&vec![1, 2, 3, 4, 5]));
    assert_eq!(z.downcast_ref::<[u64; 16]>(), Some(&[7; 16]));
    assert!(!ptr::eq(
        big.downcast_ref::<[u64; 16]>().unwrap(),
        z.downcast_ref::<[u64; 16]>().unwrap()
    ));
}

#[test]
fn test_in_place() {
    let mut x = Surface::in_place::<Circle, _>(10.0);
    let mut y = Surface::in_place::<Rectangle, _>((10.0, 5.0));

    assert_eq!(y.downcast_ref::<Rectangle>(), Some(&Rectangle::new(10.0, 5.0)));
    assert_eq!(
        y.compute_area() + x.perimeter(),
        Rectangle::new(10.0, 5.0).area() + Circle::new(10.0).circumference()
    );
    assert_eq!(x.compute_area(), Circle::new(10.0).area());
}

#[test]
fn test_is_any_cast() {
    let mut x = OnlySurface::new(Circle::new(1.0));

    assert!(is::<Circle>(&x));
    assert!(!is::<Rectangle>(&x));

    assert_eq!(x.downcast_ref::<Rectangle>(), None);

    let err = any_cast::<Rectangle>(&x).unwrap_err();
    assert_eq!(err.expected(), core::any::type_name::<Rectangle>());
    assert_eq!(err.found(), core::any::type_name::<Circle>());

    let address = x.downcast_ref::<Circle>().unwrap() as *const Circle;
    let circle = any_cast::<Circle>(&x).unwrap();
    assert!(ptr::eq(circle, address));

    any_cast_mut::<Circle>(&mut x).unwrap().radius = 2.0;
    assert_eq!(x.perimeter(), 6.28 * 2.0);
    assert!(any_cast_mut::<Rectangle>(&mut x).is_err());
}

#[test]
fn test_bad_cast_display() {
    let x: Erased<()> = Erased::new(1u8);
    let err = any_cast::<u16>(&x).unwrap_err();

    assert_eq!(
        alloc::format!("{err}"),
        "bad cast: stored `u8`, requested `u16`"
    );
}

#[test]
fn test_large_payload() {
    let mut x = MoveOnlySurface::new(BigRectangle {
        padding: [0; 100],
        inner: Rectangle::new(2.0, 2.0),
    });

    assert!(!x.is_inline());
    assert!(!MoveOnlySurface::fits::<BigRectangle>());
    assert_eq!(x.perimeter() + x.compute_area(), 8.0 + 4.0);
}

crate::behavior! {
    Computer as ComputerExt: fn compute(&self, value: i32) -> i32;
}

struct Double;
struct Square;

impl RefInvoker<Double> for Computer {
    fn invoke(_: &Double, (value,): (i32,)) -> i32 {
        value + value
    }
}

impl RefInvoker<Square> for Computer {
    fn invoke(_: &Square, (value,): (i32,)) -> i32 {
        value * value
    }
}

type Computable = Erased<(Computer,)>;

fn compute(x: Computable, value: i32) -> i32 {
    x.compute(value)
}

#[test]
fn test_compute() {
    assert_eq!(compute(Computable::new(Double), 10), 20);
    assert_eq!(compute(Computable::new(Square), 10), 100);
}

#[test]
fn test_relocate() {
    type Small = BasicErased<(Perimeter, capability::Move), 8>;
    type Large = BasicErased<(Perimeter, capability::Move), 128>;

    // Heap to inline.
    let x = Small::new(Rectangle::new(1.0, 2.0));
    assert!(!x.is_inline());
    let y: Large = x.relocate();
    assert!(y.is_inline());
    assert_eq!(y.perimeter(), 6.0);

    // Inline to heap.
    let x: Small = y.relocate();
    assert!(!x.is_inline());
    assert_eq!(x.downcast_ref::<Rectangle>(), Some(&Rectangle::new(1.0, 2.0)));

    // Heap to heap keeps the allocation.
    let address = x.downcast_ref::<Rectangle>().unwrap() as *const Rectangle;
    let z: BasicErased<(Perimeter, capability::Move), 12> = x.relocate();
    assert!(!z.is_inline());
    assert!(ptr::eq(z.downcast_ref::<Rectangle>().unwrap(), address));

    // Inline to inline.
    let w = Small::new(Circle::new(1.0));
    assert!(w.is_inline());
    let v: Large = w.relocate();
    assert!(v.is_inline());
    assert_eq!(v.perimeter(), 6.28);
}

struct DropCount {
    drops: Rc<Cell<usize>>,
}

impl Drop for DropCount {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

impl Clone for DropCount {
    fn clone(&self) -> Self {
        DropCount {
            drops: self.drops.clone(),
        }
    }
}

#[test]
fn test_drop() {
    let drops = Rc::new(Cell::new(0));

    let x: Erased<()> = Erased::new(DropCount {
        drops: drops.clone(),
    });
    assert_eq!(drops.get(), 0);
    drop(x);
    assert_eq!(drops.get(), 1);

    let x: Erased<()> = Erased::new([
        DropCount {
            drops: drops.clone(),
        },
        DropCount {
            drops: drops.clone(),
        },
        DropCount {
            drops: drops.clone(),
        },
        DropCount {
            drops: drops.clone(),
        },
    ]);
    assert!(!x.is_inline());
    drop(x);
    assert_eq!(drops.get(), 5);
}

#[test]
fn test_drop_clone_relocate() {
    let drops = Rc::new(Cell::new(0));

    let mut x: Erased<(capability::Copy, capability::Move)> = Erased::new(DropCount {
        drops: drops.clone(),
    });
    let y = x.clone();
    assert_eq!(drops.get(), 0);

    // Assignment drops the old value once.
    x.clone_from(&y);
    assert_eq!(drops.get(), 1);

    let z: BasicErased<(capability::Copy, capability::Move), 8> = x.relocate();
    assert_eq!(drops.get(), 1);

    drop(z);
    drop(y);
    assert_eq!(drops.get(), 3);
}

#[test]
fn test_downcast_drop() {
    let drops = Rc::new(Cell::new(0));

    let x: Erased<()> = Erased::new(DropCount {
        drops: drops.clone(),
    });

    let x = match x.downcast::<u32>() {
        Ok(_) => panic!("expected downcast to fail"),
        Err(x) => x,
    };
    assert_eq!(drops.get(), 0);

    let value = match x.downcast::<DropCount>() {
        Ok(value) => value,
        Err(_) => panic!("expected downcast to succeed"),
    };
    assert_eq!(drops.get(), 0);

    drop(value);
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_small_primitive() {
    let mut a: Erased<()> = Erased::new(42u32);
    assert_eq!(a.is::<u32>(), true);
    assert_eq!(a.is::<u64>(), false);
    assert_eq!(a.downcast_ref::<u32>(), Some(&42));
    assert_eq!(a.downcast_ref::<u64>(), None);
    assert_eq!(a.downcast_mut::<u32>(), Some(&mut 42));
    assert_eq!(a.downcast_mut::<u64>(), None);
    assert_eq!(a.type_id(), TypeId::of::<u32>());
    assert_eq!(a.type_name(), "u32");
    assert!(a.is_inline());

    drop(a);
}

#[test]
fn test_large_primitive() {
    type Array = [u64; 4];
    let mut array = [1u64, 2, 3, 4];

    let mut a: Erased<()> = Erased::new(array);
    assert_eq!(a.is::<Array>(), true);
    assert_eq!(a.is::<u64>(), false);
    assert_eq!(a.downcast_ref::<Array>(), Some(&array));
    assert_eq!(a.downcast_ref::<u64>(), None);
    assert_eq!(a.downcast_mut::<Array>(), Some(&mut array));
    assert_eq!(a.downcast_mut::<u64>(), None);
    assert!(!a.is_inline());

    drop(a);
}

#[test]
fn test_downcast_large_primitive() {
    type Array = [u64; 4];
    let array = [1u64, 2, 3, 4];

    let mut a: Erased<()> = Erased::new(array);

    a = match a.downcast::<u64>() {
        Ok(_) => panic!("expected downcast to fail"),
        Err(a) => a,
    };

    match a.downcast::<Array>() {
        Ok(v) => assert_eq!(v, array),
        Err(_) => panic!("expected downcast to succeed"),
    }
}

#[test]
fn test_from_box() {
    let boxed = Box::new([3u32; 42]);
    let address = &*boxed as *const [u32; 42];

    let a: Erased<()> = Erased::from_box(boxed);
    assert!(ptr::eq(a.downcast_ref::<[u32; 42]>().unwrap(), address));

    let b: Erased<()> = Erased::from_box(Box::new(5u16));
    assert!(b.is_inline());
    assert_eq!(b.downcast_ref::<u16>(), Some(&5));
}

#[test]
fn test_rc_payload() {
    let rc = Rc::new(42u32);
    let a: Erased<(capability::Copy,)> = Erased::new(rc.clone());
    let b = a.clone();
    assert_eq!(Rc::strong_count(&rc), 3);

    drop(a);
    drop(b);
    assert_eq!(Rc::strong_count(&rc), 1);
}

#[test]
fn test_view() {
    let circle = Circle::new(1.0);
    let rectangle = Rectangle::new(10.0, 5.0);

    fn simple_computation_ref(r: SurfaceRef<'_>) -> f64 {
        r.perimeter()
    }

    assert_eq!(simple_computation_ref(Ref::new(&circle)), circle.circumference());
    assert_eq!(
        simple_computation_ref(Ref::new(&rectangle)),
        rectangle.circumference()
    );

    let r = SurfaceRef::new(&circle);
    let copy = r;
    assert!(copy.is::<Circle>());
    assert!(ptr::eq(r.downcast_ref::<Circle>().unwrap(), &circle));
    assert_eq!(r.downcast_ref::<Rectangle>(), None);
}

#[test]
fn test_view_mut() {
    let mut rectangle = Rectangle::new(10.0, 5.0);

    let mut r = SurfaceMut::new(&mut rectangle);
    assert_eq!(r.perimeter() + r.compute_area(), 30.0 + 50.0);

    r.downcast_mut::<Rectangle>().unwrap().a = 1.0;
    assert_eq!(r.invoke(Perimeter, ()), 12.0);
    assert_eq!(r.invoke_mut(ComputeArea, ()), 5.0);

    let shared: Ref<'_, (ComputeArea, Perimeter)> = r.into();
    assert_eq!(shared.perimeter(), 12.0);

    assert_eq!(rectangle, Rectangle::new(1.0, 5.0));
}

#[test]
fn test_container_view() {
    let mut x = OnlySurface::new(Circle::new(1.0));

    assert_eq!(x.view().perimeter(), 6.28);
    assert!(x.view().is::<Circle>());

    let mut v = x.view_mut();
    v.downcast_mut::<Circle>().unwrap().radius = 2.0;
    assert_eq!(v.compute_area(), 3.14 * 4.0);

    assert_eq!(x.downcast_ref::<Circle>(), Some(&Circle::new(2.0)));
}

#[test]
fn test_table() {
    let a: Erased<()> = Erased::new(42u32);
    let b: Erased<()> = Erased::new(7u32);
    let c: Erased<()> = Erased::new(42i32);

    assert!(a.table() == b.table());
    assert!(a.table() != c.table());
    assert!(a.table() == Table::of::<u32>());
    assert!(a.table().is::<u32>());
    assert_eq!(a.table().layout(), core::alloc::Layout::new::<u32>());
}

#[test]
fn test_table_constructors() {
    type Copies = (Perimeter, capability::Copy);
    type Moves = (capability::Move, Perimeter);

    assert!(Table::<Copies>::of::<Circle>().copy_fn().is_some());
    assert!(Table::<Copies>::of::<Circle>().relocate_fn().is_none());
    assert!(Table::<Moves>::of::<Circle>().copy_fn().is_none());
    assert!(Table::<Moves>::of::<Circle>().relocate_fn().is_some());
    assert!(Table::<(Perimeter,)>::of::<Circle>().copy_fn().is_none());
    assert!(Table::<(Perimeter,)>::of::<Circle>().relocate_fn().is_none());

    let x: Erased<(capability::Copy,)> = Erased::new(0xAAAA_u64);
    let y = x.clone();
    assert_eq!(y.downcast_ref::<u64>(), Some(&0xAAAA));
}

#[test]
fn test_zero_sized() {
    #[derive(Debug, PartialEq)]
    struct Unit;

    #[derive(Debug, PartialEq)]
    #[repr(align(64))]
    struct Aligned;

    #[derive(Debug, PartialEq)]
    #[repr(align(32))]
    struct Wide(u8);

    let a: Erased<()> = Erased::new(Unit);
    assert!(a.is_inline());
    assert_eq!(a.downcast_ref::<Unit>(), Some(&Unit));

    let b: Erased<()> = Erased::new(Aligned);
    assert!(!b.is_inline());
    assert_eq!(b.downcast_ref::<Aligned>(), Some(&Aligned));

    let c: Erased<()> = Erased::new(Wide(3));
    assert!(!c.is_inline());
    let wide = c.downcast_ref::<Wide>().unwrap();
    assert_eq!(wide as *const Wide as usize % 32, 0);
    assert_eq!(wide, &Wide(3));
}

impl Clone for Aligned64 {
    fn clone(&self) -> Self {
        Aligned64
    }
}

#[repr(align(64))]
struct Aligned64;

#[test]
fn test_clone_zero_sized_aligned() {
    let a: Erased<(capability::Copy,)> = Erased::new(Aligned64);
    let b = a.clone();

    let p = b.downcast_ref::<Aligned64>().unwrap() as *const Aligned64;
    assert_eq!(p as usize % 64, 0);
}

#[test]
fn test_debug() {
    let a: Erased<()> = Erased::new(String::from("hello"));
    let s = alloc::format!("{a:?}");

    assert!(s.contains("String"));
    assert!(s.contains("inline: true"));
}
