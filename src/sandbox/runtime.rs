//! QuickJS 运行时

use crate::error::{PreviewError, Result};
use rquickjs::function::Rest;
use rquickjs::{Context, Ctx, Function, Result as JsResult, Runtime, Value};
use std::cell::RefCell;
use std::rc::Rc;

const MEMORY_LIMIT: usize = 256 * 1024 * 1024;
const STACK_LIMIT: usize = 1024 * 1024;

/// 单个沙箱独占的 JS 运行时
pub struct JsRuntime {
    runtime: Runtime,
    context: Context,
}

impl JsRuntime {
    pub fn new() -> Result<Self> {
        let runtime = Runtime::new().map_err(engine)?;
        runtime.set_memory_limit(MEMORY_LIMIT);
        runtime.set_max_stack_size(STACK_LIMIT);
        let context = Context::full(&runtime).map_err(engine)?;

        Ok(Self { runtime, context })
    }

    /// 执行 JS 代码，返回结果的字符串形式
    pub fn eval(&self, code: &str) -> Result<String> {
        self.context.with(|ctx| {
            let result: JsResult<Value> = ctx.eval(code);
            match result {
                Ok(val) => Ok(value_to_string(&val)),
                Err(e) => Err(PreviewError::Engine(format!("{:?}", e))),
            }
        })
    }

    /// 带名字执行一段脚本，失败时错误信息带上脚本名
    pub fn eval_named(&self, name: &str, code: &str) -> Result<String> {
        self.eval(code).map_err(|e| match e {
            PreviewError::Engine(msg) => PreviewError::Engine(format!("{}: {}", name, msg)),
            other => other,
        })
    }

    /// 注册全局函数；参数个数不定，参数和返回值都按字符串传递
    pub fn register_function<F>(&self, name: &str, func: F) -> Result<()>
    where
        F: Fn(Vec<String>) -> String + 'static,
    {
        let func = Rc::new(RefCell::new(func));
        let name_owned = name.to_string();

        self.context.with(|ctx| {
            let global = ctx.globals();
            let func_clone = func.clone();

            let js_func = Function::new(ctx.clone(), move |_ctx: Ctx, args: Rest<Value>| -> JsResult<String> {
                let string_args: Vec<String> = args.0.iter().map(value_to_string).collect();
                let f = func_clone.borrow();
                Ok(f(string_args))
            });

            match js_func {
                Ok(f) => global.set(&name_owned, f).map_err(engine),
                Err(e) => Err(engine(e)),
            }
        })
    }

    /// 以 JSON 编码的参数调用全局函数
    pub fn call_function(&self, name: &str, args: &[&str]) -> Result<String> {
        let args_str = args
            .iter()
            .map(|s| serde_json::Value::from(*s).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.eval(&format!("{}({})", name, args_str))
    }

    /// 执行完所有排队的微任务，返回执行的数量
    pub fn run_jobs(&self) -> Result<usize> {
        let mut count = 0;
        loop {
            match self.runtime.execute_pending_job() {
                Ok(true) => count += 1,
                Ok(false) => return Ok(count),
                Err(e) => return Err(PreviewError::Async(format!("{:?}", e))),
            }
        }
    }

    pub fn has_pending_jobs(&self) -> bool {
        self.runtime.is_job_pending()
    }
}

fn engine(e: rquickjs::Error) -> PreviewError {
    PreviewError::Engine(e.to_string())
}

/// 将 JS Value 转换为字符串
fn value_to_string(val: &Value) -> String {
    if val.is_undefined() {
        "undefined".to_string()
    } else if val.is_null() {
        "null".to_string()
    } else if let Some(s) = val.as_string() {
        s.to_string().unwrap_or_default()
    } else if let Some(n) = val.as_int() {
        n.to_string()
    } else if let Some(n) = val.as_float() {
        n.to_string()
    } else if let Some(b) = val.as_bool() {
        b.to_string()
    } else {
        "[object]".to_string()
    }
}
