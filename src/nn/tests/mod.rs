mod criterion;
mod layer_dense;
mod optimizer;
