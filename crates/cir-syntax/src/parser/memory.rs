//! Memory, constant and conversion operations.

use crate::adapter::AttributeForm;
use crate::ast::{CastShape, OpForm, OpKind, PtrStrideShape, TypePair};
use crate::opcode::Opcode;
use crate::token::{Punct, TokenKind};

use super::forms;
use super::modifiers::MEMORY;
use super::{OpParts, PResult, Parser};

impl Parser<'_, '_, '_> {
    /// Token index of the opcode keyword of the operation being parsed.
    pub(super) fn keyword_pos(&self) -> usize {
        self.pos.saturating_sub(1)
    }

    pub(super) fn alloca(&mut self) -> PResult<OpParts> {
        let allocated = self.ty()?;
        self.expect(Punct::Comma)?;
        let address = self.ty()?;
        self.expect(Punct::Comma)?;
        let count = if self.peek().kind == TokenKind::ValueId {
            let count = self.typed_value()?;
            self.expect(Punct::Comma)?;
            Some(count)
        } else {
            None
        };
        let (name, init) = if self.eat(Punct::LBracket) {
            let name = self.string()?;
            let init = if self.eat(Punct::Comma) {
                Some(self.ident("an initialization kind")?)
            } else {
                None
            };
            self.expect(Punct::RBracket)?;
            (Some(name), init)
        } else {
            (None, None)
        };
        let attribute = self.opt_attribute()?;
        let result = self.opt_type_annotation()?;
        Ok(OpParts::new(OpKind::Alloca {
            allocated,
            address,
            count,
            name,
            init,
            result,
        })
        .attribute(attribute))
    }

    /// `: type [, type]`, committing to the dual form on the comma.
    fn type_pair(&mut self) -> PResult<(TypePair, OpForm)> {
        self.expect(Punct::Colon)?;
        let first = self.ty()?;
        let form = forms::type_pair(self.peek());
        if form == OpForm::DualType {
            self.bump();
            let second = self.ty()?;
            Ok((TypePair::Dual(first, second), form))
        } else {
            Ok((TypePair::Single(first), form))
        }
    }

    pub(super) fn load(&mut self) -> PResult<OpParts> {
        let flags = self.modifiers(MEMORY)?.into_memory_flags();
        let address = self.value_use()?;
        let attribute = self.opt_attribute()?;
        let (types, form) = self.type_pair()?;
        Ok(OpParts::new(OpKind::Load {
            flags,
            address,
            types,
        })
        .form(form)
        .attribute(attribute))
    }

    pub(super) fn store(&mut self) -> PResult<OpParts> {
        let flags = self.modifiers(MEMORY)?.into_memory_flags();
        let value = self.value_use()?;
        self.expect(Punct::Comma)?;
        let address = self.value_use()?;
        let attribute = self.opt_attribute()?;
        let (types, form) = self.type_pair()?;
        Ok(OpParts::new(OpKind::Store {
            flags,
            value,
            address,
            types,
        })
        .form(form)
        .attribute(attribute))
    }

    pub(super) fn constant(&mut self, form: OpForm) -> PResult<OpParts> {
        let value = match form {
            OpForm::ParenthesizedValue => {
                self.expect(Punct::LParen)?;
                let value = self.attr(AttributeForm::Value)?;
                self.expect(Punct::RParen)?;
                value
            }
            OpForm::AttributeAlias => self.attr(AttributeForm::Alias)?,
            _ => self.attr(AttributeForm::Dialect)?,
        };
        let attribute = self.opt_attribute()?;
        let result = self.type_annotation()?;
        Ok(OpParts::new(OpKind::Const { value, result })
            .form(form)
            .attribute(attribute))
    }

    pub(super) fn cast(&mut self, form: OpForm) -> PResult<OpParts> {
        let keyword = self.keyword_pos();
        if form == OpForm::Parenthesized {
            self.expect(Punct::LParen)?;
            let kind = self.ident("a cast kind")?;
            self.expect(Punct::Comma)?;
            let value = self.value_use()?;
            self.expect(Punct::Colon)?;
            let source = self.ty()?;
            self.expect(Punct::RParen)?;
            let attribute = self.opt_attribute()?;
            self.expect(Punct::Comma)?;
            let result = self.ty()?;
            let shape = CastShape::Parenthesized { source, result };
            return Ok(OpParts::new(OpKind::Cast { kind, value, shape })
                .form(form)
                .attribute(attribute));
        }
        let kind = self.ident("a cast kind")?;
        let value = self.value_use()?;
        let attribute = self.opt_attribute()?;
        let signature = self.opt_function_type()?;
        if signature.is_none() {
            let span = self.span_since(keyword);
            self.deprecated(
                Opcode::Cast,
                "bare `cir.cast` without a type annotation",
                span,
            );
        }
        let shape = CastShape::Bare { signature };
        Ok(OpParts::new(OpKind::Cast { kind, value, shape })
            .form(form)
            .attribute(attribute))
    }

    pub(super) fn ptr_stride(&mut self, form: OpForm) -> PResult<OpParts> {
        let keyword = self.keyword_pos();
        if form == OpForm::Parenthesized {
            self.expect(Punct::LParen)?;
            let base = self.typed_value()?;
            self.expect(Punct::Comma)?;
            let stride = self.typed_value()?;
            self.expect(Punct::RParen)?;
            let attribute = self.opt_attribute()?;
            self.expect(Punct::Comma)?;
            let result = self.ty()?;
            let shape = PtrStrideShape::Parenthesized {
                base_type: base.ty,
                stride_type: stride.ty,
                result,
            };
            return Ok(OpParts::new(OpKind::PtrStride {
                base: base.value,
                stride: stride.value,
                shape,
            })
            .form(form)
            .attribute(attribute));
        }
        let base = self.value_use()?;
        self.expect(Punct::Comma)?;
        let stride = self.value_use()?;
        let signature = self.opt_function_type()?;
        if signature.is_none() {
            let span = self.span_since(keyword);
            self.deprecated(
                Opcode::PtrStride,
                "bare `cir.ptr_stride` without a type annotation",
                span,
            );
        }
        Ok(OpParts::new(OpKind::PtrStride {
            base,
            stride,
            shape: PtrStrideShape::Bare { signature },
        })
        .form(form))
    }

    pub(super) fn struct_element_addr(&mut self) -> PResult<OpParts> {
        let base = self.value_use()?;
        self.expect(Punct::Comma)?;
        let index = self.integer()?;
        let attribute = self.opt_attribute()?;
        let result = self.type_annotation()?;
        Ok(OpParts::new(OpKind::StructElementAddr {
            base,
            index,
            result,
        })
        .attribute(attribute))
    }

    pub(super) fn get_member(&mut self) -> PResult<OpParts> {
        let base = self.value_use()?;
        self.expect(Punct::LBracket)?;
        let index = self.integer()?;
        self.expect(Punct::RBracket)?;
        let attribute = self.opt_attribute()?;
        let result = self.type_annotation()?;
        Ok(OpParts::new(OpKind::GetMember {
            base,
            index,
            result,
        })
        .attribute(attribute))
    }

    pub(super) fn copy(&mut self, form: OpForm) -> PResult<OpParts> {
        let keyword = self.keyword_pos();
        if form == OpForm::To {
            let src = self.value_use()?;
            self.expect_word("to")?;
            let dst = self.value_use()?;
            let result = Some(self.type_annotation()?);
            return Ok(OpParts::new(OpKind::Copy { src, dst, result }).form(form));
        }
        let dst = self.value_use()?;
        self.expect(Punct::Comma)?;
        let src = self.value_use()?;
        let attribute = self.opt_attribute()?;
        let result = self.opt_type_annotation()?;
        if result.is_none() {
            let span = self.span_since(keyword);
            self.deprecated(
                Opcode::Copy,
                "comma-form `cir.copy` without a type annotation",
                span,
            );
        }
        Ok(OpParts::new(OpKind::Copy { src, dst, result })
            .form(form)
            .attribute(attribute))
    }

    /// `%len bytes from %src to %dst : signature`
    pub(super) fn memcpy(&mut self) -> PResult<OpParts> {
        let len = self.value_use()?;
        self.expect_word("bytes")?;
        self.expect_word("from")?;
        let src = self.value_use()?;
        self.expect_word("to")?;
        let dst = self.value_use()?;
        let signature = self.function_type()?;
        Ok(OpParts::new(OpKind::Memcpy {
            len,
            src,
            dst,
            signature,
        }))
    }

    pub(super) fn memchr(&mut self, form: OpForm) -> PResult<OpParts> {
        let parenthesized = form == OpForm::Parenthesized;
        if parenthesized {
            self.expect(Punct::LParen)?;
        }
        let src = self.value_use()?;
        self.expect(Punct::Comma)?;
        let pattern = self.value_use()?;
        self.expect(Punct::Comma)?;
        let len = self.value_use()?;
        let signature = if parenthesized {
            self.expect(Punct::RParen)?;
            None
        } else {
            Some(self.function_type()?)
        };
        Ok(OpParts::new(OpKind::Memchr {
            src,
            pattern,
            len,
            signature,
        })
        .form(form))
    }

    pub(super) fn stack_save(&mut self) -> PResult<OpParts> {
        let result = self.type_annotation()?;
        Ok(OpParts::new(OpKind::StackSave { result }))
    }

    pub(super) fn stack_restore(&mut self) -> PResult<OpParts> {
        let value = self.value_use()?;
        let result = self.type_annotation()?;
        Ok(OpParts::new(OpKind::StackRestore { value, result }))
    }

    /// `%base [ %member : type ] : signature`
    pub(super) fn get_runtime_member(&mut self) -> PResult<OpParts> {
        let base = self.value_use()?;
        self.expect(Punct::LBracket)?;
        let member = self.typed_value()?;
        self.expect(Punct::RBracket)?;
        let signature = self.function_type()?;
        Ok(OpParts::new(OpKind::GetRuntimeMember {
            base,
            member,
            signature,
        }))
    }
}
