pub mod call;
pub mod contract;
pub mod dispatch;
pub mod params;
pub mod planner;
pub mod types;

use catalog::InstanceCatalog;
use core_types::{DescriptorError, KernelInstance, OperationDescriptor};
use fragments::{FragmentKind, FragmentStore, Substitutions};
use tracing::{debug, info, warn};

pub use call::CallSite;
pub use dispatch::{DispatchArm, DispatchPlan};
pub use params::{Param, ParamRole, param_list};
pub use planner::{PlannedShapes, ShapePlanner, ShapeSlot};
pub use types::{Diagnostic, GeneratedArtifact, Severity, SynthError};

/// Assembles the declaration, definition and call sites of gemm+bias
/// functions from the fragments of one shared store.
pub struct FunctionSynthesizer<'s> {
    store: &'s FragmentStore,
}

impl<'s> FunctionSynthesizer<'s> {
    pub fn new(store: &'s FragmentStore) -> Self {
        Self { store }
    }

    /// Build the catalog from `instances` (in order), then synthesize
    pub fn synthesize_instances<I>(
        &self,
        desc: &OperationDescriptor,
        instances: I,
        planner: &dyn ShapePlanner,
    ) -> Result<GeneratedArtifact, SynthError>
    where
        I: IntoIterator<Item = KernelInstance>,
    {
        let catalog = InstanceCatalog::from_instances(instances)?;
        self.synthesize(desc, &catalog, planner)
    }

    /// Generate both artifacts and check their calling convention.
    /// Any error aborts the whole request.
    pub fn synthesize(
        &self,
        desc: &OperationDescriptor,
        catalog: &InstanceCatalog,
        planner: &dyn ShapePlanner,
    ) -> Result<GeneratedArtifact, SynthError> {
        desc.validate()?;
        check_reserved_symbols(desc, catalog)?;

        let plan = DispatchPlan::from_catalog(catalog);
        let diagnostics = plan.diagnostics(&desc.function_name);
        for d in &diagnostics {
            match d.severity {
                Severity::Warning => warn!(function = %desc.function_name, rule = d.rule, "{}", d.message),
                Severity::Info => debug!(function = %desc.function_name, rule = d.rule, "{}", d.message),
            }
        }

        let declaration = self.declaration(desc)?;
        let definition = self.definition(desc, catalog, &plan, planner)?;
        contract::verify(desc, &declaration, &definition)?;

        info!(
            function = %desc.function_name,
            instances = catalog.len(),
            split_k = desc.supports_split_k,
            "synthesized gemm+bias function"
        );
        Ok(GeneratedArtifact {
            function_name: desc.function_name.clone(),
            declaration,
            definition,
            diagnostics,
        })
    }

    /// Prototype for callers; parameter types only
    pub fn declaration(&self, desc: &OperationDescriptor) -> Result<String, SynthError> {
        Ok(self.store.render(FragmentKind::FunctionDeclaration, &signature_subs(desc))?)
    }

    /// Translation unit holding the instances and the dispatching function
    pub fn definition(
        &self,
        desc: &OperationDescriptor,
        catalog: &InstanceCatalog,
        plan: &DispatchPlan,
        planner: &dyn ShapePlanner,
    ) -> Result<String, SynthError> {
        let instances = catalog.render_all(self.store)?.join("\n");
        let exec_paths = plan.render(self.store, &planner.render(ShapeSlot::ProblemArgs))?;

        let mut subs = signature_subs(desc)
            .set("instances", instances)
            .set("exec_paths", exec_paths);
        for slot in ShapeSlot::ALL {
            if slot != ShapeSlot::ProblemArgs {
                subs.insert(slot.name(), planner.render(slot));
            }
        }
        Ok(self.store.render(FragmentKind::FunctionDefinition, &subs)?)
    }

    /// Statement calling the generated function with `call`'s expressions
    pub fn synthesize_call(&self, desc: &OperationDescriptor, call: &CallSite) -> Result<String, SynthError> {
        desc.validate()?;

        if desc.supports_split_k != call.split_k.is_some() {
            return Err(SynthError::ContractViolation {
                function: desc.function_name.clone(),
                detail: format!(
                    "call site {} a split-k argument but the function {} one",
                    if call.split_k.is_some() { "passes" } else { "omits" },
                    if desc.supports_split_k { "takes" } else { "does not take" },
                ),
            });
        }
        let dims = (call.input_dims.len(), call.weight_dims.len(), call.output_dims.len());
        if dims != (desc.input_rank, desc.weight_rank, desc.output_rank()) {
            return Err(DescriptorError::RankMismatch {
                function: desc.function_name.clone(),
                input_rank: desc.input_rank as i64,
                weight_rank: desc.weight_rank as i64,
                reason: format!(
                    "call site passes {} input, {} weight and {} output dims",
                    dims.0, dims.1, dims.2
                ),
            }
            .into());
        }

        let args: Vec<String> = param_list(desc)
            .iter()
            .map(|p| match p.role {
                ParamRole::Input => call.input.as_str(),
                ParamRole::Weight => call.weight.as_str(),
                ParamRole::Bias => call.bias.as_str(),
                ParamRole::Output => call.output.as_str(),
                ParamRole::Workspace => call.workspace.as_str(),
                ParamRole::SplitK => call.split_k.as_deref().unwrap_or_default(),
                ParamRole::InputDim(i) => call.input_dims[i].as_str(),
                ParamRole::WeightDim(i) => call.weight_dims[i].as_str(),
                ParamRole::OutputDim(i) => call.output_dims[i].as_str(),
                ParamRole::Stream => call.stream.as_str(),
            })
            .map(str::to_string)
            .collect();

        let text = self.store.render(
            FragmentKind::FunctionCall,
            &Substitutions::new()
                .set("indent", " ".repeat(call.indent))
                .set("function_name", desc.function_name.as_str())
                .set("args", args),
        )?;
        contract::verify_call(desc, &text)?;
        Ok(text)
    }
}

/// Names the generated definition binds on its own
const GENERATED_LOCALS: &[&str] = &["ElementComputeEpilogue", "arguments", "gemm_op", "status", "CUTLASS_CHECK"];

/// An instance alias sharing a name with the function, one of its
/// parameters or a generated local would not compile.
fn check_reserved_symbols(desc: &OperationDescriptor, catalog: &InstanceCatalog) -> Result<(), SynthError> {
    let params = param_list(desc);
    for inst in catalog.iter() {
        let symbol = inst.symbol_name.as_str();
        let clashes_with = if symbol == desc.function_name {
            "the generated function".to_string()
        } else if params.iter().any(|p| p.name == symbol) {
            format!("parameter `{symbol}`")
        } else if GENERATED_LOCALS.contains(&symbol) {
            format!("generated local `{symbol}`")
        } else {
            continue;
        };
        return Err(SynthError::ReservedSymbol {
            function: desc.function_name.clone(),
            symbol: symbol.to_string(),
            clashes_with,
        });
    }
    Ok(())
}

fn signature_subs(desc: &OperationDescriptor) -> Substitutions {
    Substitutions::new()
        .set("function_name", desc.function_name.as_str())
        .set("elem_type", desc.element_type.cpp_name())
        .set("support_split_k", desc.supports_split_k)
        .set("input_ndims", desc.input_rank)
        .set("weight_ndims", desc.weight_rank)
}


#[cfg(test)]
mod tests {
    use super::*;
    use catalog::CatalogError;
    use contract::{declaration_params, definition_params, strip_names};
    use core_types::ElementType;
    use proptest::prelude::*;

    /// Marks each slot so its position in the output can be checked
    struct MarkerPlanner;

    impl ShapePlanner for MarkerPlanner {
        fn render(&self, slot: ShapeSlot) -> String {
            format!("/* slot:{slot} */")
        }
    }

    fn store() -> FragmentStore {
        FragmentStore::new().unwrap()
    }

    fn inst(symbol: &str) -> KernelInstance {
        KernelInstance::new(symbol, format!("{symbol}_base"), format!("using {symbol}_base = Gemm<>;"))
    }

    fn gemm_bias_2d() -> OperationDescriptor {
        OperationDescriptor::new("gemm_bias_2d", 2, 2)
    }

    #[test]
    fn two_dim_declaration_has_twelve_parameters() {
        let store = store();
        let art = FunctionSynthesizer::new(&store)
            .synthesize_instances(&gemm_bias_2d(), [inst("f_any")], &MarkerPlanner)
            .unwrap();

        let decl = declaration_params(&art.declaration, "gemm_bias_2d").unwrap();
        assert_eq!(decl.len(), 12);
        assert!(!decl.iter().any(|t| t == "int"));
        assert!(!art.definition.contains("split_k"));
        assert!(art.warnings().next().is_none());
    }

    #[test]
    fn split_k_is_thirteenth_parameter_after_workspace() {
        let store = store();
        let desc = gemm_bias_2d().with_split_k(true);
        let art = FunctionSynthesizer::new(&store)
            .synthesize_instances(&desc, [inst("f_any")], &MarkerPlanner)
            .unwrap();

        let decl = declaration_params(&art.declaration, "gemm_bias_2d").unwrap();
        assert_eq!(decl.len(), 13);
        assert_eq!(decl[4], "uint8_t*");
        assert_eq!(decl[5], "int");

        let def = definition_params(&art.definition, "gemm_bias_2d").unwrap();
        assert_eq!(def[5], ("int".to_string(), "split_k".to_string()));
    }

    #[test]
    fn body_sections_are_in_order() {
        let store = store();
        let art = FunctionSynthesizer::new(&store)
            .synthesize_instances(&gemm_bias_2d(), [inst("f_a").when("M % 8 == 0"), inst("f_any")], &MarkerPlanner)
            .unwrap();
        let def = &art.definition;

        let pos = |needle: &str| def.find(needle).unwrap_or_else(|| panic!("missing `{needle}`"));
        let order = [
            pos("/* slot:extra_code */"),
            pos("using f_a = f_a_base;"),
            pos("void gemm_bias_2d("),
            pos("/* slot:shape_eval */"),
            pos("/* slot:input_addr_calculator */"),
            pos("/* slot:output_addr_calculator */"),
            pos("/* slot:extra_shape */"),
            pos("/* slot:input_output_checks */"),
            pos("if (!bias_ptr)"),
            pos("if (M % 8 == 0)"),
            pos("if (true)"),
            pos("std::cout << \"input_ndims0: \""),
            pos("Unsupported workload for this gemm_bias_2d specialization."),
        ];
        assert!(order.windows(2).all(|w| w[0] < w[1]), "sections out of order: {order:?}");
        assert!(def.contains("throw std::runtime_error(\"bias_ptr is null!\");"));
        assert!(def.contains("/* slot:problem_args */"));
    }

    #[test]
    fn unmatched_shapes_reach_the_diagnostic_block() {
        let store = store();
        let desc = OperationDescriptor::new("gemm_bias_3d", 3, 2);
        let art = FunctionSynthesizer::new(&store)
            .synthesize_instances(&desc, [inst("f_a").when("N == 64"), inst("f_b").when("N == 128")], &MarkerPlanner)
            .unwrap();
        let def = &art.definition;

        // every arm returns, so only falling through all of them reaches the dump
        let tail = &def[def.rfind("return;").unwrap()..];
        assert!(!tail.contains("gemm_op"));
        for line in [
            "\"input_ndims2: \" << *a_dim2",
            "\"weight_ndims1: \" << *b_dim1",
            "\"output_ndims2: \" << *c_dim2",
            "Unsupported workload for this gemm_bias_3d specialization.",
        ] {
            assert!(tail.contains(line), "diagnostic block lacks `{line}`");
        }
        assert!(art.diagnostics.iter().any(|d| d.rule == "no-catch-all"));
    }

    #[test]
    fn duplicate_symbols_produce_no_artifact() {
        let store = store();
        let err = FunctionSynthesizer::new(&store)
            .synthesize_instances(&gemm_bias_2d(), [inst("f0").when("M == 1"), inst("f0")], &MarkerPlanner)
            .unwrap_err();
        assert_eq!(err, SynthError::Catalog(CatalogError::DuplicateSymbol { symbol: "f0".into() }));
    }

    #[test]
    fn malformed_descriptor_is_rejected() {
        let store = store();
        let synth = FunctionSynthesizer::new(&store);
        let err = synth
            .synthesize_instances(&OperationDescriptor::new("g", 0, 2), [inst("f")], &MarkerPlanner)
            .unwrap_err();
        assert!(matches!(err, SynthError::Descriptor(DescriptorError::RankMismatch { .. })));

        let err = synth
            .synthesize_instances(&OperationDescriptor::new("g", 2, 0), [inst("f")], &MarkerPlanner)
            .unwrap_err();
        assert!(matches!(err, SynthError::Descriptor(DescriptorError::RankMismatch { .. })));
    }

    #[test]
    fn high_rank_descriptor_generates() {
        let store = store();
        let desc = OperationDescriptor::new("gemm_bias_10d", 10, 9);
        let art = FunctionSynthesizer::new(&store)
            .synthesize_instances(&desc, [inst("f_any")], &MarkerPlanner)
            .unwrap();
        let decl = declaration_params(&art.declaration, "gemm_bias_10d").unwrap();
        assert_eq!(decl.len(), 5 + 10 + 9 + 10 + 1);
        assert!(art.definition.contains("int64_t* b_dim8,"));
        assert!(art.definition.contains("\"output_ndims9: \" << *c_dim9"));
    }

    #[test]
    fn symbols_clashing_with_generated_names_are_rejected() {
        let store = store();
        let synth = FunctionSynthesizer::new(&store);
        let desc = gemm_bias_2d().with_split_k(true);

        for (symbol, clash) in [
            ("gemm_bias_2d", "the generated function"),
            ("a_ptr", "parameter `a_ptr`"),
            ("split_k", "parameter `split_k`"),
            ("c_dim1", "parameter `c_dim1`"),
            ("stream", "parameter `stream`"),
            ("workspace", "parameter `workspace`"),
            ("gemm_op", "generated local `gemm_op`"),
            ("arguments", "generated local `arguments`"),
            ("ElementComputeEpilogue", "generated local `ElementComputeEpilogue`"),
        ] {
            let err = synth
                .synthesize_instances(&desc, [inst("f_a").when("M == 1"), inst(symbol)], &MarkerPlanner)
                .unwrap_err();
            assert_eq!(
                err,
                SynthError::ReservedSymbol {
                    function: "gemm_bias_2d".into(),
                    symbol: symbol.into(),
                    clashes_with: clash.into(),
                },
            );
        }

        // a split-k name is only taken when the function has the parameter
        assert!(synth.synthesize_instances(&gemm_bias_2d(), [inst("split_k")], &MarkerPlanner).is_ok());
    }

    #[test]
    fn forward_declaration_in_extra_code_is_not_the_definition() {
        let store = store();
        let synth = FunctionSynthesizer::new(&store);
        let desc = gemm_bias_2d();
        let shapes = PlannedShapes {
            extra_code: synth.declaration(&desc).unwrap(),
            ..PlannedShapes::default()
        };

        let art = synth.synthesize_instances(&desc, [inst("f_any")], &shapes).unwrap();
        assert!(art.definition.find(");").unwrap() < art.definition.find(") {").unwrap());
        let def = definition_params(&art.definition, "gemm_bias_2d").unwrap();
        assert_eq!(def[0], ("cutlass::half_t*".to_string(), "a_ptr".to_string()));
        assert_eq!(def.len(), 12);
    }

    #[test]
    fn empty_catalog_falls_through_to_the_diagnostic_block() {
        let store = store();
        let art = FunctionSynthesizer::new(&store)
            .synthesize_instances(&gemm_bias_2d(), Vec::new(), &MarkerPlanner)
            .unwrap();

        let warnings: Vec<_> = art.warnings().map(|d| d.rule).collect();
        assert_eq!(warnings, ["empty-dispatch-plan"]);

        let def = &art.definition;
        let bias = def.find("throw std::runtime_error(\"bias_ptr is null!\");").unwrap();
        let after_bias = &def[bias..];
        assert!(!after_bias.contains("gemm_op"));
        assert!(!after_bias.contains("return;"));
        let dump = after_bias.find("std::cout << \"input_ndims0: \"").unwrap();
        // only the closing brace of the bias check sits between the two
        assert_eq!(after_bias[..dump].lines().skip(1).map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>(), ["}"]);
    }

    #[test]
    fn catch_all_first_still_generates_with_warnings() {
        let store = store();
        let art = FunctionSynthesizer::new(&store)
            .synthesize_instances(&gemm_bias_2d(), [inst("f_any"), inst("f_a").when("K == 8")], &MarkerPlanner)
            .unwrap();
        let warnings: Vec<_> = art.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].symbol.as_deref(), Some("f_a"));
    }

    #[test]
    fn drifted_declaration_fragment_is_a_contract_violation() {
        let store = FragmentStore::from_sources([(
            FragmentKind::FunctionDeclaration,
            "void {{ function_name }}({{ elem_type }}*, {{ elem_type }}*, {{ elem_type }}*, \
             {{ elem_type }}*, uint8_t*, cudaStream_t);",
        )])
        .unwrap();
        let err = FunctionSynthesizer::new(&store)
            .synthesize_instances(&gemm_bias_2d(), [inst("f_any")], &MarkerPlanner)
            .unwrap_err();
        assert!(matches!(err, SynthError::ContractViolation { ref function, .. } if function == "gemm_bias_2d"));
    }

    #[test]
    fn call_site_follows_the_convention() {
        let store = store();
        let synth = FunctionSynthesizer::new(&store);
        let desc = gemm_bias_2d().with_split_k(true);
        let call = CallSite::new("a", "b", "bias", "c")
            .with_split_k("split_k")
            .with_dims(["&M", "&K"], ["&N", "&K"], ["&M", "&N"])
            .with_indent(2);

        let text = synth.synthesize_call(&desc, &call).unwrap();
        let args = contract::call_arguments(&text, "gemm_bias_2d").unwrap();
        assert_eq!(args.len(), 13);
        assert_eq!(args[4], "global_workspace_");
        assert_eq!(args[5], "split_k");
        assert_eq!(args[12], "stream");
        assert!(text.starts_with("  gemm_bias_2d("));
    }

    #[test]
    fn call_site_mismatches_are_rejected() {
        let store = store();
        let synth = FunctionSynthesizer::new(&store);
        let call = CallSite::new("a", "b", "bias", "c").with_dims(["&M", "&K"], ["&N", "&K"], ["&M", "&N"]);

        let err = synth.synthesize_call(&gemm_bias_2d().with_split_k(true), &call).unwrap_err();
        assert!(matches!(err, SynthError::ContractViolation { .. }));

        let short = call.clone().with_dims(["&M"], ["&N", "&K"], ["&M", "&N"]);
        let err = synth.synthesize_call(&gemm_bias_2d(), &short).unwrap_err();
        assert!(matches!(err, SynthError::Descriptor(DescriptorError::RankMismatch { .. })));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Declaration and definition always expose the same parameter types
        #[test]
        fn prop_definition_matches_declaration(
            input_rank in 1..=12usize,
            weight_rank in 1..=12usize,
            split_k in any::<bool>(),
            elem in prop::sample::select(ElementType::all().to_vec()),
        ) {
            let store = store();
            let desc = OperationDescriptor::new("gemm_bias_nd", input_rank, weight_rank)
                .with_split_k(split_k)
                .with_element_type(elem);
            let art = FunctionSynthesizer::new(&store)
                .synthesize_instances(&desc, [inst("f_any")], &MarkerPlanner)
                .unwrap();

            let decl = declaration_params(&art.declaration, "gemm_bias_nd").unwrap();
            let def = definition_params(&art.definition, "gemm_bias_nd").unwrap();
            prop_assert_eq!(&strip_names(&def), &decl);
            prop_assert_eq!(decl.len(), 5 + usize::from(split_k) + 2 * input_rank + weight_rank + 1);
            prop_assert_eq!(decl[5] == "int", split_k);
            prop_assert_eq!(decl[0].clone(), format!("{}*", elem.cpp_name()));
        }
    }
}
