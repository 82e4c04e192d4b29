use core_types::OperationDescriptor;

/// What a parameter of the generated function carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRole {
    Input,
    Weight,
    Bias,
    Output,
    Workspace,
    SplitK,
    InputDim(usize),
    WeightDim(usize),
    OutputDim(usize),
    Stream,
}

/// One parameter of the generated function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub role: ParamRole,
    pub ty:   String,
    pub name: String,
}

impl Param {
    fn new(role: ParamRole, ty: impl Into<String>, name: impl Into<String>) -> Self {
        Self { role, ty: ty.into(), name: name.into() }
    }
}

/// The calling convention of the generated function, in order:
/// - four element pointers: input, weight, bias, output
/// - workspace
/// - `split_k`, only when the descriptor supports it
/// - one extent pointer per input, weight and output dimension
///   (the output mirrors the input rank)
/// - the stream handle
pub fn param_list(desc: &OperationDescriptor) -> Vec<Param> {
    let elem_ptr = format!("{}*", desc.element_type.cpp_name());
    let mut params = Vec::with_capacity(6 + 2 * desc.input_rank + desc.weight_rank + 1);

    params.push(Param::new(ParamRole::Input,  &elem_ptr, "a_ptr"));
    params.push(Param::new(ParamRole::Weight, &elem_ptr, "b_ptr"));
    params.push(Param::new(ParamRole::Bias,   &elem_ptr, "bias_ptr"));
    params.push(Param::new(ParamRole::Output, &elem_ptr, "c_ptr"));
    params.push(Param::new(ParamRole::Workspace, "uint8_t*", "workspace"));
    if desc.supports_split_k {
        params.push(Param::new(ParamRole::SplitK, "int", "split_k"));
    }
    for i in 0..desc.input_rank {
        params.push(Param::new(ParamRole::InputDim(i), "int64_t*", format!("a_dim{i}")));
    }
    for i in 0..desc.weight_rank {
        params.push(Param::new(ParamRole::WeightDim(i), "int64_t*", format!("b_dim{i}")));
    }
    for i in 0..desc.output_rank() {
        params.push(Param::new(ParamRole::OutputDim(i), "int64_t*", format!("c_dim{i}")));
    }
    params.push(Param::new(ParamRole::Stream, "cudaStream_t", "stream"));
    params
}

/// Just the types of [`param_list`]
pub fn param_types(desc: &OperationDescriptor) -> Vec<String> {
    param_list(desc).into_iter().map(|p| p.ty).collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ElementType;

    #[test]
    fn two_by_two_without_split_k() {
        let desc = OperationDescriptor::new("gemm_bias_2d", 2, 2);
        let params = param_list(&desc);
        assert_eq!(params.len(), 12);
        assert!(params.iter().all(|p| p.role != ParamRole::SplitK));
        assert_eq!(params[4].name, "workspace");
        assert_eq!(params[5].role, ParamRole::InputDim(0));
        assert_eq!(params[11].ty, "cudaStream_t");
    }

    #[test]
    fn split_k_follows_workspace() {
        let desc = OperationDescriptor::new("gemm_bias_2d", 2, 2).with_split_k(true);
        let params = param_list(&desc);
        assert_eq!(params.len(), 13);
        assert_eq!(params[5], Param::new(ParamRole::SplitK, "int", "split_k"));
    }

    #[test]
    fn output_dims_mirror_input_rank() {
        let desc = OperationDescriptor::new("g", 3, 2).with_element_type(ElementType::F32);
        let params = param_list(&desc);
        let out_dims: Vec<_> = params.iter()
            .filter(|p| matches!(p.role, ParamRole::OutputDim(_)))
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(out_dims, ["c_dim0", "c_dim1", "c_dim2"]);
        assert_eq!(params[0].ty, "float*");
    }
}
