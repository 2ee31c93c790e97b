use burn::{
    prelude::*,
    tensor::{backend::Backend, BasicOps, Element, TensorData},
};

/// Batches of observations shaped into a tensor, batch dimension first
///
/// This is how an agent stays agnostic of the observation kind: the state type
/// decides its tensor layout. Implemented for `Vec<T>` of scalars, vectors,
/// stacked frames and channel-first images.
pub trait ToTensor<B: Backend, const D: usize, K: BasicOps<B>> {
    fn to_tensor(self, device: &B::Device) -> Tensor<B, D, K>;
}

/// `Vec<E>` → `[batch]`
impl<B, E, K> ToTensor<B, 1, K> for Vec<E>
where
    B: Backend,
    E: Element,
    K: BasicOps<B, Elem = E>,
{
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 1, K> {
        let len = self.len();
        Tensor::from_data(TensorData::new(self, [len]), device)
    }
}

/// `Vec<[E; A]>` → `[batch, A]`
impl<B, E, K, const A: usize> ToTensor<B, 2, K> for Vec<[E; A]>
where
    B: Backend,
    E: Element,
    K: BasicOps<B, Elem = E>,
{
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 2, K> {
        let batch = self.len();
        let flat: Vec<E> = self.into_iter().flatten().collect();
        Tensor::from_data(TensorData::new(flat, [batch, A]), device)
    }
}

/// `Vec<[[E; A]; F]>` → `[batch, F, A]`, e.g. the last `F` observations
impl<B, E, K, const F: usize, const A: usize> ToTensor<B, 3, K> for Vec<[[E; A]; F]>
where
    B: Backend,
    E: Element,
    K: BasicOps<B, Elem = E>,
{
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 3, K> {
        let batch = self.len();
        let flat: Vec<E> = self.into_iter().flatten().flatten().collect();
        Tensor::from_data(TensorData::new(flat, [batch, F, A]), device)
    }
}

/// `Vec<[[[E; W]; H]; C]>` → `[batch, C, H, W]`, channel-first images
impl<B, E, K, const C: usize, const H: usize, const W: usize> ToTensor<B, 4, K>
    for Vec<[[[E; W]; H]; C]>
where
    B: Backend,
    E: Element,
    K: BasicOps<B, Elem = E>,
{
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 4, K> {
        let batch = self.len();
        let flat: Vec<E> = self.into_iter().flatten().flatten().flatten().collect();
        Tensor::from_data(TensorData::new(flat, [batch, C, H, W]), device)
    }
}
