//! Flow checks run after attribution.

use crate::ast::NodeKind;
use crate::binding::Binding;
use crate::compiler::UnitContext;
use crate::problem::ProblemId;

/// Reports locals that are declared but never read. Parameters, catch
/// parameters and lambda parameters are exempt.
pub(crate) fn analyze(cx: &mut UnitContext<'_>) -> usize {
    let mut reported = 0;
    for (id, node) in cx.tree.iter() {
        let NodeKind::LocalDeclaration(var) = &node.kind else {
            continue;
        };
        let Some(Binding::Local(local)) = cx.tree.binding(id) else {
            continue;
        };
        let Some(binding) = cx.env.local(local) else {
            continue;
        };
        if binding.used || binding.is_argument {
            continue;
        }
        let warning = cx.factory.warning(
            ProblemId::LOCAL_VARIABLE_IS_NEVER_USED,
            &cx.tree.path,
            node.span,
            vec![var.name.clone()],
        );
        if let Some(warning) = warning {
            cx.problems.push(warning);
            reported += 1;
        }
    }
    reported
}
