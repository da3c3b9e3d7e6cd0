//! 同步引擎
//!
//! 逐层配对本地目录与远程目录：每层列一次本地、列一次远程，按名称取并集
//! 后逐项决定动作，目录深度优先递归。所有调用顺序执行，不并发。

use crate::core::conflict::{write_local_atomic, ConflictResolver};
use crate::core::exclude::ExclusionMatcher;
use crate::core::hasher::content_hash_file;
use crate::core::outcome::{LogEvent, LogKind, LogSink, SyncOutcome};
use crate::core::snapshot::{FileSnapshot, Snapshot, SnapshotStore};
use crate::db::{Direction, SyncPair};
use crate::error::{RemoteError, SyncError, SyncResult};
use crate::remote::{join_remote, RemoteEntry, RemoteStore};
use futures::future::{BoxFuture, FutureExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 本地临时文件后缀，列目录时忽略
const TEMP_SUFFIXES: [&str; 2] = [".dropsync-part", ".dropsync-tmp"];

/// 本地目录中的一个子项
#[derive(Debug, Clone)]
struct LocalChild {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

/// 远程目录列举结果
enum Listing {
    Entries(Vec<RemoteEntry>),
    /// 远程目录不存在
    Missing,
    /// 列举失败，已记录错误
    Failed,
}

/// 单次运行的可变状态，由遍历独占
struct RunState<'s> {
    outcome: SyncOutcome,
    sink: &'s dyn LogSink,
    exclusions: ExclusionMatcher,
    mirror: bool,
    old_snapshot: Snapshot,
    new_snapshot: Snapshot,
}

impl<'s> RunState<'s> {
    fn new(pair: &SyncPair, sink: &'s dyn LogSink) -> Self {
        Self {
            outcome: SyncOutcome::new(&pair.id),
            sink,
            exclusions: ExclusionMatcher::new(&pair.excluded_paths),
            mirror: pair.method.is_mirror(),
            old_snapshot: Snapshot::new(),
            new_snapshot: Snapshot::new(),
        }
    }

    async fn log(&mut self, event: LogEvent) {
        match event.kind {
            LogKind::Error => error!("{} {}", event.message, event.details.as_deref().unwrap_or("")),
            LogKind::Conflict => warn!("{}", event.message),
            _ => info!("{}", event.message),
        }
        self.sink.emit(&event).await;
        self.outcome.events.push(event);
    }

    /// 记录逐项失败并计数
    async fn fail(&mut self, message: String, err: &(dyn std::fmt::Display + Sync)) {
        self.outcome.errors += 1;
        self.log(LogEvent::error(message).with_details(err.to_string())).await;
    }

    fn record(&mut self, rel_path: &str, hash: Option<String>) {
        self.new_snapshot
            .insert(rel_path.to_string(), FileSnapshot::new(rel_path, hash));
    }

    fn was_synced(&self, rel_path: &str) -> Option<&FileSnapshot> {
        self.old_snapshot.get(rel_path)
    }

    /// 保留旧快照中该路径及其子路径的记录（本轮无法确认状态时使用）
    fn carry_forward(&mut self, rel_prefix: &str) {
        let prefix = format!("{}/", rel_prefix);
        let kept: Vec<FileSnapshot> = self
            .old_snapshot
            .values()
            .filter(|s| rel_prefix.is_empty() || s.path == rel_prefix || s.path.starts_with(&prefix))
            .filter(|s| !self.exclusions.matches(&s.path))
            .cloned()
            .collect();

        for entry in kept {
            self.new_snapshot.entry(entry.path.clone()).or_insert(entry);
        }
    }
}

fn join_rel(rel: &str, name: &str) -> String {
    if rel.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", rel, name)
    }
}

/// 远程路径不区分大小写，配对时按小写名称
fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// 两个哈希都已知且相同才视为相等
fn hashes_equal(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

/// 认证失败需要中止整次运行，其它错误交给调用方逐项处理
fn fatal(err: RemoteError) -> SyncResult<RemoteError> {
    if err.is_unauthorized() {
        Err(SyncError::Unauthorized)
    } else {
        Ok(err)
    }
}

async fn list_local(dir: &Path) -> std::io::Result<Vec<LocalChild>> {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut children = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            debug!("跳过非 UTF-8 文件名: {:?}", entry.path());
            continue;
        };
        if TEMP_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            continue;
        }

        let path = entry.path();
        let file_type = match entry.file_type().await {
            Ok(t) => t,
            Err(e) => {
                debug!("跳过无法读取的条目 {:?}: {}", path, e);
                continue;
            }
        };

        // 不进入符号链接指向的目录，指向文件的链接按文件处理
        let is_dir = if file_type.is_symlink() {
            match tokio::fs::metadata(&path).await {
                Ok(m) if m.is_dir() => {
                    debug!("跳过指向目录的符号链接: {:?}", path);
                    continue;
                }
                Ok(_) => false,
                Err(e) => {
                    debug!("跳过失效的符号链接 {:?}: {}", path, e);
                    continue;
                }
            }
        } else {
            file_type.is_dir()
        };

        children.push(LocalChild { name, path, is_dir });
    }

    Ok(children)
}

/// 同步引擎
pub struct SyncEngine {
    remote: Arc<dyn RemoteStore>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl SyncEngine {
    pub fn new(remote: Arc<dyn RemoteStore>, snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self { remote, snapshots }
    }

    /// 运行一个同步对
    ///
    /// 只有认证失败和本地根目录缺失会返回 Err，其余失败都记入结果的 errors。
    pub async fn run_sync(&self, pair: &SyncPair, sink: &dyn LogSink) -> SyncResult<SyncOutcome> {
        let mut run = RunState::new(pair, sink);

        info!(
            "开始同步: {} -> {} ({:?}, 远程: {})",
            pair.local_root.display(),
            pair.remote_path,
            pair.method,
            self.remote.name()
        );
        run.log(LogEvent::new(
            LogKind::Start,
            format!("=== 开始同步 ({}) ===", pair.remote_path),
        ))
        .await;

        let root_ok = tokio::fs::metadata(&pair.local_root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !root_ok {
            let root = pair.local_root.display().to_string();
            run.log(LogEvent::error("本地目录不存在").with_details(root.clone())).await;
            return Err(SyncError::LocalRootMissing(root));
        }

        let local_root = pair.local_root.clone();
        let remote_root = pair.remote_path.clone();

        let result = match pair.method.direction() {
            Direction::Push => {
                self.push_dir(&mut run, local_root, remote_root, String::new(), false)
                    .await
            }
            Direction::Pull => {
                self.pull_dir(&mut run, local_root, remote_root, String::new())
                    .await
            }
            Direction::TwoWay => {
                run.old_snapshot = self.snapshots.load(&pair.id).await;
                debug!("已加载 {} 条快照记录", run.old_snapshot.len());

                let result = self
                    .two_way_dir(&mut run, local_root, remote_root, String::new(), false)
                    .await;

                if result.is_ok() {
                    if let Err(e) = self.snapshots.save(&pair.id, &run.new_snapshot).await {
                        run.fail("保存同步快照失败".to_string(), &SyncError::Storage(e.to_string()))
                            .await;
                    }
                }
                result
            }
        };

        if let Err(e) = result {
            run.log(LogEvent::error("同步中止").with_details(e.to_string())).await;
            return Err(e);
        }

        match run.outcome.summary() {
            Some(summary) => run.log(LogEvent::info(summary)).await,
            None if run.outcome.errors == 0 => run.log(LogEvent::info("未检测到变化")).await,
            None => {}
        }
        run.log(LogEvent::new(LogKind::End, "=== 同步完成 ===")).await;

        let mut outcome = run.outcome;
        outcome.finished_at = chrono::Utc::now().timestamp();
        Ok(outcome)
    }

    /// 列出远程目录；known_empty 时跳过调用
    async fn list_remote(
        &self,
        run: &mut RunState<'_>,
        remote_dir: &str,
        rel: &str,
        known_empty: bool,
    ) -> SyncResult<Listing> {
        if known_empty {
            return Ok(Listing::Entries(Vec::new()));
        }

        match self.remote.list_folder(remote_dir).await {
            Ok(entries) => Ok(Listing::Entries(entries)),
            Err(RemoteError::NotFound(_)) => Ok(Listing::Missing),
            Err(e) => {
                let e = fatal(e)?;
                run.fail(format!("列出远程目录失败: /{}", rel), &e).await;
                Ok(Listing::Failed)
            }
        }
    }

    async fn read_local_dir(&self, run: &mut RunState<'_>, dir: &Path, rel: &str) -> Option<Vec<LocalChild>> {
        match list_local(dir).await {
            Ok(children) => Some(children),
            Err(e) => {
                run.fail(format!("读取本地目录失败: /{}", rel), &e).await;
                None
            }
        }
    }

    async fn upload(
        &self,
        run: &mut RunState<'_>,
        local_path: &Path,
        remote_path: &str,
        rel_path: &str,
    ) -> SyncResult<bool> {
        let data = match tokio::fs::read(local_path).await {
            Ok(data) => data,
            Err(e) => {
                run.fail(format!("上传失败: {}", rel_path), &e).await;
                return Ok(false);
            }
        };

        let size = data.len();
        match self.remote.upload_file(remote_path, data).await {
            Ok(()) => {
                debug!("已上传: {} ({} 字节)", rel_path, size);
                run.outcome.uploaded += 1;
                Ok(true)
            }
            Err(e) => {
                let e = fatal(e)?;
                run.fail(format!("上传失败: {}", rel_path), &e).await;
                Ok(false)
            }
        }
    }

    async fn download(
        &self,
        run: &mut RunState<'_>,
        remote_path: &str,
        local_path: &Path,
        rel_path: &str,
    ) -> SyncResult<bool> {
        let data = match self.remote.download_file(remote_path).await {
            Ok(data) => data,
            Err(e) => {
                let e = fatal(e)?;
                run.fail(format!("下载失败: {}", rel_path), &e).await;
                return Ok(false);
            }
        };

        if let Some(parent) = local_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                run.fail(format!("创建本地目录失败: {}", rel_path), &e).await;
                return Ok(false);
            }
        }

        match write_local_atomic(local_path, &data).await {
            Ok(()) => {
                debug!("已下载: {} ({} 字节)", rel_path, data.len());
                run.outcome.downloaded += 1;
                Ok(true)
            }
            Err(e) => {
                run.fail(format!("写入本地文件失败: {}", rel_path), &e).await;
                Ok(false)
            }
        }
    }

    async fn delete_remote(&self, run: &mut RunState<'_>, remote_path: &str, rel_path: &str) -> SyncResult<bool> {
        match self.remote.delete_file(remote_path).await {
            Ok(()) => {
                debug!("已删除远程: {}", rel_path);
                run.outcome.deleted += 1;
                Ok(true)
            }
            Err(e) => {
                let e = fatal(e)?;
                run.fail(format!("删除远程文件失败: {}", rel_path), &e).await;
                Ok(false)
            }
        }
    }

    async fn delete_local(&self, run: &mut RunState<'_>, child: &LocalChild, rel_path: &str) -> bool {
        let result = if child.is_dir {
            tokio::fs::remove_dir_all(&child.path).await
        } else {
            tokio::fs::remove_file(&child.path).await
        };

        match result {
            Ok(()) => {
                debug!("已删除本地: {}", rel_path);
                run.outcome.deleted += 1;
                true
            }
            Err(e) => {
                run.fail(format!("删除本地文件失败: {}", rel_path), &e).await;
                false
            }
        }
    }

    async fn type_mismatch(&self, run: &mut RunState<'_>, rel_path: &str) {
        run.fail(
            format!("类型不一致，已跳过: {}", rel_path),
            &"本地与远程一端是文件、另一端是目录",
        )
        .await;
    }

    /// 上传方向（本地 -> 远程），mirror 时删除远程多余条目
    fn push_dir<'a, 's: 'a>(
        &'a self,
        run: &'a mut RunState<'s>,
        local_dir: PathBuf,
        remote_dir: String,
        rel: String,
        remote_known_empty: bool,
    ) -> BoxFuture<'a, SyncResult<()>> {
        async move {
            let Some(local) = self.read_local_dir(run, &local_dir, &rel).await else {
                return Ok(());
            };
            let remote = match self.list_remote(run, &remote_dir, &rel, remote_known_empty).await? {
                Listing::Entries(entries) => entries,
                // 上传时会自动创建父目录
                Listing::Missing => Vec::new(),
                Listing::Failed => return Ok(()),
            };
            let remote_map: HashMap<String, &RemoteEntry> =
                remote.iter().map(|e| (name_key(&e.name), e)).collect();

            for child in &local {
                let rel_path = join_rel(&rel, &child.name);
                if run.exclusions.matches(&rel_path) {
                    debug!("排除: {}", rel_path);
                    continue;
                }

                let remote_entry = remote_map.get(&name_key(&child.name)).copied();
                let target = remote_entry
                    .map(|e| e.display_path.clone())
                    .unwrap_or_else(|| join_remote(&remote_dir, &child.name));

                if child.is_dir {
                    if remote_entry.is_some_and(|e| !e.is_folder) {
                        self.type_mismatch(run, &rel_path).await;
                        continue;
                    }
                    self.push_dir(run, child.path.clone(), target, rel_path, remote_entry.is_none())
                        .await?;
                    continue;
                }

                if remote_entry.is_some_and(|e| e.is_folder) {
                    self.type_mismatch(run, &rel_path).await;
                    continue;
                }

                let should_upload = match remote_entry.and_then(|e| e.content_hash.as_deref()) {
                    Some(remote_hash) => {
                        let local_hash = content_hash_file(&child.path).await;
                        !hashes_equal(local_hash.as_deref(), Some(remote_hash))
                    }
                    None => true,
                };

                if should_upload {
                    self.upload(run, &child.path, &target, &rel_path).await?;
                }
            }

            if run.mirror {
                let local_names: HashSet<String> = local.iter().map(|c| name_key(&c.name)).collect();
                for entry in &remote {
                    let rel_path = join_rel(&rel, &entry.name);
                    if run.exclusions.matches(&rel_path) || local_names.contains(&name_key(&entry.name)) {
                        continue;
                    }
                    self.delete_remote(run, &entry.display_path, &rel_path).await?;
                }
            }

            Ok(())
        }
        .boxed()
    }

    /// 下载方向（远程 -> 本地），mirror 时删除本地多余条目
    fn pull_dir<'a, 's: 'a>(
        &'a self,
        run: &'a mut RunState<'s>,
        local_dir: PathBuf,
        remote_dir: String,
        rel: String,
    ) -> BoxFuture<'a, SyncResult<()>> {
        async move {
            let remote = match self.list_remote(run, &remote_dir, &rel, false).await? {
                Listing::Entries(entries) => entries,
                Listing::Missing => {
                    // 远程目录不存在时不能当作空目录，否则 mirror 会清空本地
                    run.fail(
                        format!("远程目录不存在: /{}", rel),
                        &RemoteError::NotFound(remote_dir.clone()),
                    )
                    .await;
                    return Ok(());
                }
                Listing::Failed => return Ok(()),
            };
            let Some(local) = self.read_local_dir(run, &local_dir, &rel).await else {
                return Ok(());
            };
            let local_map: HashMap<String, &LocalChild> =
                local.iter().map(|c| (name_key(&c.name), c)).collect();

            for entry in &remote {
                let rel_path = join_rel(&rel, &entry.name);
                if run.exclusions.matches(&rel_path) {
                    debug!("排除: {}", rel_path);
                    continue;
                }

                let local_child = local_map.get(&name_key(&entry.name)).copied();

                if entry.is_folder {
                    let target = match local_child {
                        Some(c) if !c.is_dir => {
                            self.type_mismatch(run, &rel_path).await;
                            continue;
                        }
                        Some(c) => c.path.clone(),
                        None => {
                            let path = local_dir.join(&entry.name);
                            if let Err(e) = tokio::fs::create_dir_all(&path).await {
                                run.fail(format!("创建本地目录失败: {}", rel_path), &e).await;
                                continue;
                            }
                            path
                        }
                    };
                    self.pull_dir(run, target, entry.display_path.clone(), rel_path)
                        .await?;
                    continue;
                }

                let should_download = match local_child {
                    Some(c) if c.is_dir => {
                        self.type_mismatch(run, &rel_path).await;
                        continue;
                    }
                    Some(c) => {
                        let local_hash = content_hash_file(&c.path).await;
                        !hashes_equal(local_hash.as_deref(), entry.content_hash.as_deref())
                    }
                    None => true,
                };

                if should_download {
                    let target = local_child
                        .map(|c| c.path.clone())
                        .unwrap_or_else(|| local_dir.join(&entry.name));
                    self.download(run, &entry.display_path, &target, &rel_path).await?;
                }
            }

            if run.mirror {
                let remote_names: HashSet<String> = remote.iter().map(|e| name_key(&e.name)).collect();
                for child in &local {
                    let rel_path = join_rel(&rel, &child.name);
                    if run.exclusions.matches(&rel_path) || remote_names.contains(&name_key(&child.name)) {
                        continue;
                    }
                    self.delete_local(run, child, &rel_path).await;
                }
            }

            Ok(())
        }
        .boxed()
    }

    /// 双向同步，以旧快照作为共同祖先做三方合并
    fn two_way_dir<'a, 's: 'a>(
        &'a self,
        run: &'a mut RunState<'s>,
        local_dir: PathBuf,
        remote_dir: String,
        rel: String,
        remote_known_empty: bool,
    ) -> BoxFuture<'a, SyncResult<()>> {
        async move {
            let Some(local) = self.read_local_dir(run, &local_dir, &rel).await else {
                run.carry_forward(&rel);
                return Ok(());
            };

            let remote = match self.list_remote(run, &remote_dir, &rel, remote_known_empty).await? {
                Listing::Entries(entries) => entries,
                // 首次同步且远程根目录尚未创建
                Listing::Missing if rel.is_empty() && run.old_snapshot.is_empty() => {
                    if let Err(e) = self.remote.create_folder(&remote_dir).await {
                        let e = fatal(e)?;
                        run.fail("创建远程根目录失败".to_string(), &e).await;
                        return Ok(());
                    }
                    Vec::new()
                }
                Listing::Missing => {
                    run.fail(
                        format!("远程目录不存在: /{}", rel),
                        &RemoteError::NotFound(remote_dir.clone()),
                    )
                    .await;
                    run.carry_forward(&rel);
                    return Ok(());
                }
                Listing::Failed => {
                    run.carry_forward(&rel);
                    return Ok(());
                }
            };

            let mut names: BTreeMap<String, (Option<&LocalChild>, Option<&RemoteEntry>)> = BTreeMap::new();
            for child in &local {
                names.entry(name_key(&child.name)).or_default().0 = Some(child);
            }
            for entry in &remote {
                names.entry(name_key(&entry.name)).or_default().1 = Some(entry);
            }

            for sides in names.into_values() {
                // 以本地名称为准
                let name = match sides {
                    (Some(l), _) => l.name.as_str(),
                    (None, Some(r)) => r.name.as_str(),
                    (None, None) => continue,
                };
                let rel_path = join_rel(&rel, name);
                if run.exclusions.matches(&rel_path) {
                    debug!("排除: {}", rel_path);
                    continue;
                }

                match sides {
                    (Some(l), Some(r)) if l.is_dir && r.is_folder => {
                        self.two_way_dir(run, l.path.clone(), r.display_path.clone(), rel_path, false)
                            .await?;
                    }
                    (Some(l), Some(r)) if l.is_dir || r.is_folder => {
                        self.type_mismatch(run, &rel_path).await;
                        run.carry_forward(&rel_path);
                    }
                    (Some(l), None) if l.is_dir => {
                        let target = join_remote(&remote_dir, name);
                        match self.remote.create_folder(&target).await {
                            Ok(()) => {
                                self.two_way_dir(run, l.path.clone(), target, rel_path, true)
                                    .await?;
                            }
                            Err(e) => {
                                let e = fatal(e)?;
                                run.fail(format!("创建远程目录失败: {}", rel_path), &e).await;
                                run.carry_forward(&rel_path);
                            }
                        }
                    }
                    (None, Some(r)) if r.is_folder => {
                        let target = local_dir.join(name);
                        match tokio::fs::create_dir_all(&target).await {
                            Ok(()) => {
                                self.two_way_dir(run, target, r.display_path.clone(), rel_path, false)
                                    .await?;
                            }
                            Err(e) => {
                                run.fail(format!("创建本地目录失败: {}", rel_path), &e).await;
                                run.carry_forward(&rel_path);
                            }
                        }
                    }
                    (Some(l), Some(r)) => {
                        self.two_way_both(run, &local_dir, l, r, &rel_path).await?;
                    }
                    (Some(l), None) => {
                        self.two_way_local_only(run, &remote_dir, l, &rel_path).await?;
                    }
                    (None, Some(r)) => {
                        self.two_way_remote_only(run, &local_dir, r, &rel_path).await?;
                    }
                    (None, None) => {}
                }
            }

            Ok(())
        }
        .boxed()
    }

    /// 失败时保留旧快照记录，避免下次把它误判为两端新建
    fn keep_old(run: &mut RunState<'_>, rel_path: &str) {
        if let Some(old) = run.was_synced(rel_path).cloned() {
            run.new_snapshot.insert(rel_path.to_string(), old);
        }
    }

    async fn two_way_both(
        &self,
        run: &mut RunState<'_>,
        local_dir: &Path,
        local: &LocalChild,
        remote: &RemoteEntry,
        rel_path: &str,
    ) -> SyncResult<()> {
        let local_hash = content_hash_file(&local.path).await;
        let remote_hash = remote.content_hash.clone();

        if hashes_equal(local_hash.as_deref(), remote_hash.as_deref()) {
            run.record(rel_path, local_hash);
            return Ok(());
        }

        let snap_hash = run.was_synced(rel_path).and_then(|s| s.hash.clone());
        let local_changed =
            snap_hash.is_none() || !hashes_equal(local_hash.as_deref(), snap_hash.as_deref());
        let remote_changed =
            snap_hash.is_none() || !hashes_equal(remote_hash.as_deref(), snap_hash.as_deref());

        if local_changed && !remote_changed {
            if self.upload(run, &local.path, &remote.display_path, rel_path).await? {
                run.record(rel_path, local_hash);
            } else {
                Self::keep_old(run, rel_path);
            }
        } else if remote_changed && !local_changed {
            if self.download(run, &remote.display_path, &local.path, rel_path).await? {
                run.record(rel_path, remote_hash);
            } else {
                Self::keep_old(run, rel_path);
            }
        } else {
            run.outcome.conflicts += 1;
            run.log(
                LogEvent::new(LogKind::Conflict, format!("检测到冲突: {}", rel_path)).with_details(format!(
                    "本地哈希: {}\n远程哈希: {}",
                    local_hash.as_deref().unwrap_or("未知"),
                    remote_hash.as_deref().unwrap_or("未知")
                )),
            )
            .await;

            let resolver = ConflictResolver::new(self.remote.as_ref());
            match resolver.keep_both(local_dir, &local.name, &remote.display_path).await {
                Ok(copy) => {
                    debug!("冲突副本: {:?}", copy);
                    run.outcome.downloaded += 1;
                    run.record(rel_path, remote_hash);
                }
                Err(SyncError::Unauthorized) => return Err(SyncError::Unauthorized),
                Err(e) => {
                    run.fail(format!("处理冲突失败: {}", rel_path), &e).await;
                    Self::keep_old(run, rel_path);
                }
            }
        }

        Ok(())
    }

    async fn two_way_local_only(
        &self,
        run: &mut RunState<'_>,
        remote_dir: &str,
        local: &LocalChild,
        rel_path: &str,
    ) -> SyncResult<()> {
        if run.was_synced(rel_path).is_some() {
            // 上次已同步，远程不存在说明远程已删除
            if !self.delete_local(run, local, rel_path).await {
                Self::keep_old(run, rel_path);
            }
            return Ok(());
        }

        let local_hash = content_hash_file(&local.path).await;
        let target = join_remote(remote_dir, &local.name);
        if self.upload(run, &local.path, &target, rel_path).await? {
            run.record(rel_path, local_hash);
        }
        Ok(())
    }

    async fn two_way_remote_only(
        &self,
        run: &mut RunState<'_>,
        local_dir: &Path,
        remote: &RemoteEntry,
        rel_path: &str,
    ) -> SyncResult<()> {
        if run.was_synced(rel_path).is_some() {
            // 上次已同步，本地不存在说明本地已删除
            if !self.delete_remote(run, &remote.display_path, rel_path).await? {
                Self::keep_old(run, rel_path);
            }
            return Ok(());
        }

        let target = local_dir.join(&remote.name);
        if self.download(run, &remote.display_path, &target, rel_path).await? {
            run.record(rel_path, remote.content_hash.clone());
        }
        Ok(())
    }
}
