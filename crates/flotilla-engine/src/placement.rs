use flotilla_core::types::{Job, Node};

/// Nodes able to take `job` right now: a free job slot plus at least the
/// requested cpu and memory headroom. Order is preserved from `nodes`, so
/// the caller's first element encodes first-fit.
pub fn fit_available<'a>(job: &Job, nodes: &'a [Node]) -> Vec<&'a Node> {
    nodes
        .iter()
        .filter(|node| {
            node.jobs_allocated < node.jobs_capacity
                && node.cpu_capacity - node.cpu_allocated >= job.requests_cpu
                && node.memory_capacity - node.memory_allocated >= job.requests_memory
        })
        .collect()
}

/// Rebuild a node's allocation counters from the jobs still running on it.
/// This recount is authoritative; it reconciles any counter drift left by
/// job deletions between ticks.
pub fn recalc_allocated_resources(node: &mut Node, running_jobs: &[Job]) {
    node.jobs_allocated = 0;
    node.cpu_allocated = 0.0;
    node.memory_allocated = 0;
    for job in running_jobs {
        node.jobs_allocated += 1;
        node.cpu_allocated += job.requests_cpu;
        node.memory_allocated += job.requests_memory;
    }
}
