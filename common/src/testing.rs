//! テスト用のスクリプト化ゲートウェイ
//!
//! メモリ上でバックエンドの振る舞い（プロフィールCRUD、アップロード、選択、
//! チャット）を再現し、操作ごとに失敗を注入できる。

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::gateway::{op, require, BackendGateway};
use crate::types::{
    ChatReply, KnowledgeGraph, Photo, PhotoListing, Ping, ProfileEntry, ReviewReply,
    SelectionReceipt, UploadFile, UploadReceipt,
};

const STATIC_BASE: &str = "http://backend.test/static";

type Hook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Script {
    profiles: Vec<String>,
    photos: HashMap<String, Vec<Photo>>,
    selected: HashMap<String, String>,
    failing: HashSet<&'static str>,
    auto_reply: Option<String>,
    select_url: Option<String>,
    chat_reply: Option<String>,
    review: Option<String>,
    graphs: HashMap<String, KnowledgeGraph>,
    public_urls: bool,
    yielding: bool,
    calls: Vec<String>,
}

/// メモリ上のバックエンド
pub struct ScriptedGateway {
    script: Mutex<Script>,
    select_hook: Mutex<Option<Hook>>,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::with_profiles(&[])
    }
}

impl ScriptedGateway {
    pub fn with_profiles(names: &[&str]) -> Self {
        let script = Script {
            profiles: names.iter().map(|n| n.to_string()).collect(),
            public_urls: true,
            ..Default::default()
        };
        Self {
            script: Mutex::new(script),
            select_hook: Mutex::new(None),
        }
    }

    /// アップロードのレスポンスに `public_url` を含めない
    pub fn without_public_urls(self) -> Self {
        self.script().public_urls = false;
        self
    }

    /// 指定した操作を500で失敗させる
    pub fn fail_on(&self, operation: &'static str) {
        self.script().failing.insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.script().failing.remove(operation);
    }

    pub fn set_auto_reply(&self, reply: Option<&str>) {
        self.script().auto_reply = reply.map(str::to_string);
    }

    pub fn set_select_url(&self, url: Option<&str>) {
        self.script().select_url = url.map(str::to_string);
    }

    pub fn set_chat_reply(&self, reply: Option<&str>) {
        self.script().chat_reply = reply.map(str::to_string);
    }

    pub fn set_review(&self, review: Option<&str>) {
        self.script().review = review.map(str::to_string);
    }

    pub fn set_graph(&self, profile: &str, graph: KnowledgeGraph) {
        self.script().graphs.insert(profile.to_string(), graph);
    }

    /// 各呼び出しで一度だけ制御を返す（実行の交互進行を再現）
    pub fn enable_yielding(&self) {
        self.script().yielding = true;
    }

    /// 選択処理の途中で呼ばれるフック
    pub fn on_select(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.select_hook.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(hook));
    }

    /// 呼び出し履歴（`操作:引数...`）
    pub fn calls(&self) -> Vec<String> {
        self.script().calls.clone()
    }

    pub fn selected(&self, profile: &str) -> Option<String> {
        self.script().selected.get(profile).cloned()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 呼び出しを記録し、注入された失敗を返す
    async fn enter(&self, operation: &'static str, args: &[&str]) -> Result<(), GatewayError> {
        let yielding = {
            let mut script = self.script();
            let mut call = operation.to_string();
            for arg in args {
                call.push(':');
                call.push_str(arg);
            }
            script.calls.push(call);
            script.yielding
        };
        if yielding {
            tokio::task::yield_now().await;
        }
        if self.script().failing.contains(operation) {
            return Err(GatewayError::status(operation, 500, "Internal Server Error"));
        }
        Ok(())
    }

    fn known_profile(&self, operation: &'static str, name: &str) -> Result<(), GatewayError> {
        if self.script().profiles.iter().any(|p| p == name) {
            Ok(())
        } else {
            Err(GatewayError::status(operation, 404, "{\"detail\":\"Profile not found\"}"))
        }
    }
}

#[async_trait(?Send)]
impl BackendGateway for ScriptedGateway {
    async fn list_profiles(&self) -> Result<Vec<ProfileEntry>, GatewayError> {
        self.enter(op::LIST_PROFILES, &[]).await?;
        Ok(self
            .script()
            .profiles
            .iter()
            .map(|name| ProfileEntry { name: name.clone() })
            .collect())
    }

    async fn create_profile(&self, name: &str) -> Result<(), GatewayError> {
        require(op::CREATE_PROFILE, "name", name)?;
        self.enter(op::CREATE_PROFILE, &[name]).await?;
        let mut script = self.script();
        if script.profiles.iter().any(|p| p == name) {
            return Err(GatewayError::status(
                op::CREATE_PROFILE,
                400,
                "{\"detail\":\"Profile already exists\"}",
            ));
        }
        script.profiles.push(name.to_string());
        Ok(())
    }

    async fn delete_profile(&self, name: &str) -> Result<(), GatewayError> {
        require(op::DELETE_PROFILE, "name", name)?;
        self.enter(op::DELETE_PROFILE, &[name]).await?;
        self.known_profile(op::DELETE_PROFILE, name)?;
        let mut script = self.script();
        script.profiles.retain(|p| p != name);
        script.photos.remove(name);
        script.selected.remove(name);
        script.graphs.remove(name);
        Ok(())
    }

    async fn select_profile(&self, name: &str) -> Result<(), GatewayError> {
        require(op::SELECT_PROFILE, "name", name)?;
        self.enter(op::SELECT_PROFILE, &[name]).await?;
        self.known_profile(op::SELECT_PROFILE, name)
    }

    async fn list_photos(&self, profile: &str) -> Result<PhotoListing, GatewayError> {
        require(op::LIST_PHOTOS, "profile", profile)?;
        self.enter(op::LIST_PHOTOS, &[profile]).await?;
        let script = self.script();
        let uploaded = script.photos.get(profile).cloned().unwrap_or_default();
        let selected = script
            .selected
            .get(profile)
            .and_then(|name| uploaded.iter().find(|p| &p.filename == name).cloned());
        Ok(PhotoListing {
            uploaded_images: uploaded,
            selected_image: selected,
        })
    }

    async fn upload_photo(&self, profile: &str, file: &UploadFile) -> Result<UploadReceipt, GatewayError> {
        require(op::UPLOAD_PHOTO, "profile", profile)?;
        require(op::UPLOAD_PHOTO, "file", &file.name)?;
        self.enter(op::UPLOAD_PHOTO, &[profile, file.name.as_str()]).await?;

        let mut script = self.script();
        let public_url = format!("{}/{}/uploads/{}", STATIC_BASE, profile, file.name);
        script.photos.entry(profile.to_string()).or_default().push(Photo {
            filename: file.name.clone(),
            uploaded_path: format!("data/profiles/{}/uploads/{}", profile, file.name),
            processed_path: String::new(),
            public_url: public_url.clone(),
        });
        Ok(UploadReceipt {
            filename: file.name.clone(),
            public_url: script.public_urls.then_some(public_url),
        })
    }

    async fn select_photo(&self, profile: &str, filename: &str) -> Result<SelectionReceipt, GatewayError> {
        require(op::SELECT_PHOTO, "profile", profile)?;
        require(op::SELECT_PHOTO, "image_name", filename)?;
        self.enter(op::SELECT_PHOTO, &[profile, filename]).await?;

        if let Some(hook) = self.select_hook.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            hook();
        }

        let mut script = self.script();
        let exists = script
            .photos
            .get(profile)
            .is_some_and(|photos| photos.iter().any(|p| p.filename == filename));
        if !exists {
            return Err(GatewayError::status(op::SELECT_PHOTO, 404, "{\"detail\":\"Not Found\"}"));
        }
        script.selected.insert(profile.to_string(), filename.to_string());
        Ok(SelectionReceipt {
            url: script.select_url.clone(),
            auto_reply: script.auto_reply.clone(),
        })
    }

    async fn chat(&self, profile: &str, message: &str) -> Result<ChatReply, GatewayError> {
        require(op::CHAT, "profile", profile)?;
        require(op::CHAT, "user_message", message)?;
        self.enter(op::CHAT, &[profile, message]).await?;
        let reply = self
            .script()
            .chat_reply
            .clone()
            .unwrap_or_else(|| format!("echo: {}", message));
        Ok(ChatReply { reply })
    }

    async fn year_in_review(&self, profile: &str) -> Result<ReviewReply, GatewayError> {
        require(op::YEAR_IN_REVIEW, "profile", profile)?;
        self.enter(op::YEAR_IN_REVIEW, &[profile]).await?;
        Ok(ReviewReply {
            reply: self.script().review.clone(),
            summary: None,
        })
    }

    async fn fetch_graph(&self, profile: &str) -> Result<KnowledgeGraph, GatewayError> {
        require(op::FETCH_GRAPH, "profile", profile)?;
        self.enter(op::FETCH_GRAPH, &[profile]).await?;
        self.known_profile(op::FETCH_GRAPH, profile)?;
        Ok(self.script().graphs.get(profile).cloned().unwrap_or_default())
    }

    async fn ping(&self) -> Result<Ping, GatewayError> {
        self.enter(op::PING, &[]).await?;
        Ok(Ping {
            status: "ok".into(),
            message: "scripted backend".into(),
        })
    }
}
