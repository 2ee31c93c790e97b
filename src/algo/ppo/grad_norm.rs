//! Global L2 norm of a module's gradients
//!
//! The norm is taken over every parameter gradient at once. Clipping rescales
//! all gradients by the same factor, so the update direction is kept.

use std::marker::PhantomData;

use burn::{
    module::{AutodiffModule, ModuleVisitor, ParamId},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

struct SquaredNorm<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    total: f32,
    backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            self.total += grad.powf_scalar(2.0).sum().into_scalar().elem::<f32>();
        }
    }
}

struct Rescale<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    scale: f32,
    backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Rescale<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) else {
            return;
        };

        self.grads
            .register::<B::InnerBackend, D>(id, grad.mul_scalar(self.scale));
    }
}

/// `sqrt(Σ ‖g‖²)` over the gradients of every parameter of `module`
pub fn global_grad_norm<B, M>(module: &M, grads: &GradientsParams) -> f32
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut visitor = SquaredNorm::<B> {
        grads,
        total: 0.0,
        backend: PhantomData,
    };
    module.visit(&mut visitor);
    visitor.total.sqrt()
}

/// Scale every gradient by `max_norm / (norm + 1e-6)` when the global norm
/// exceeds `max_norm`
///
/// Returns the norm measured before clipping.
pub fn clip_grad_norm<B, M>(module: &M, grads: &mut GradientsParams, max_norm: f32) -> f32
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let norm = global_grad_norm::<B, M>(module, grads);
    if norm > max_norm {
        let mut visitor = Rescale::<B> {
            grads,
            scale: max_norm / (norm + 1e-6),
            backend: PhantomData,
        };
        module.visit(&mut visitor);
    }
    norm
}
