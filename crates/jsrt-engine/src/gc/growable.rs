//! Growable array helper: a length counter tracked separately from
//! current allocated capacity, with `grow_to` eliding the reallocation
//! call when the existing allocation already covers the requested
//! length.

/// A resizable, element-typed buffer that tracks allocated capacity
/// separately from logical length, so repeated `grow_to` calls with
/// a slowly increasing `n` don't reallocate on every call.
pub struct GrowableArray<T> {
    data: Vec<T>,
    string_only: bool,
}

impl<T: Default + Clone> GrowableArray<T> {
    pub fn new(string_only: bool) -> Self {
        Self {
            data: Vec::new(),
            string_only,
        }
    }

    pub fn with_capacity(capacity: usize, string_only: bool) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            string_only,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn allocated(&self) -> usize {
        self.data.capacity()
    }

    pub fn is_string_only(&self) -> bool {
        self.string_only
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Ensures the array addresses at least `n` elements, padding new
    /// slots with `T::default()` and updating the length to exactly
    /// `n`. Fast path: if capacity already covers `n`, no
    /// reallocation occurs.
    pub fn grow_to(&mut self, n: usize) {
        if n <= self.data.capacity() && n <= self.data.len() {
            self.data.truncate(n);
            return;
        }
        if n > self.data.capacity() {
            self.data.reserve(n - self.data.len());
        }
        if n > self.data.len() {
            self.data.resize(n, T::default());
        } else {
            self.data.truncate(n);
        }
    }

    pub fn push(&mut self, value: T) {
        self.data.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_to_extends_and_fills_default() {
        let mut g: GrowableArray<i32> = GrowableArray::new(false);
        g.grow_to(4);
        assert_eq!(g.len(), 4);
        assert_eq!(g.as_slice(), &[0, 0, 0, 0]);
    }

    #[test]
    fn grow_to_fast_path_skips_realloc_when_capacity_covers_n() {
        let mut g: GrowableArray<i32> = GrowableArray::with_capacity(16, false);
        g.grow_to(4);
        let cap_after_first = g.allocated();
        g.grow_to(8);
        assert_eq!(g.allocated(), cap_after_first);
    }

    #[test]
    fn grow_to_can_shrink_logical_length() {
        let mut g: GrowableArray<i32> = GrowableArray::new(false);
        g.grow_to(5);
        g.grow_to(2);
        assert_eq!(g.len(), 2);
    }
}
