use std::cell::Cell;

#[derive(Default)]
pub struct NumCell<T> {
    t: Cell<T>,
}

impl<T: Copy> NumCell<T> {
    #[inline(always)]
    pub fn new(t: T) -> Self {
        Self { t: Cell::new(t) }
    }

    #[inline(always)]
    pub fn get(&self) -> T {
        self.t.get()
    }

    #[inline(always)]
    pub fn set(&self, n: T) {
        self.t.set(n);
    }
}
