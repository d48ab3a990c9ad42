use futures::StreamExt;
use futures::stream;
use std::future::Future;

/// 以受限并发执行一组异步任务。
/// 返回值的顺序与任务的提交顺序一致，与各任务的完成先后无关
pub async fn do_parallel_with_limit<T, F>(tasks: Vec<F>, max_parallels: usize) -> Vec<T>
where
    F: Future<Output = T>,
{
    stream::iter(tasks)
        .buffered(max_parallels.max(1))
        .collect()
        .await
}
